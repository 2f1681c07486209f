//! Typed facade over the `step` certificate-authority CLI.
//!
//! The CA client issues short-lived SSH certificates after a successful
//! identity-provider login. This module owns every invocation of the tool:
//! trust bootstrap, certificate inspection, and the interactive login flow.

mod bootstrap;
mod inspect;
mod login;

pub use inspect::{ExpiryStatus, format_expiry};

use std::sync::Arc;

use crate::config::Settings;

/// Handle to the local CA client binary.
#[derive(Clone)]
pub struct CaClient {
    settings: Arc<Settings>,
}

impl CaClient {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    fn step(&self) -> &str {
        &self.settings.step_binary
    }
}
