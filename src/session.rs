//! Shared login/status state and the background refresh loop.
//!
//! One [`SessionManager`] is shared between the caller-facing entry points
//! and the background refresh task. The login gate guarantees a status
//! refresh never overlaps a login in flight: the scheduler takes the gate
//! for the duration of a tick, the login flow holds it for its entire
//! multi-step run, and contention is resolved by skipping (scheduler) or
//! rejecting (login) rather than queueing.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::ca::{CaClient, ExpiryStatus, format_expiry};
use crate::config::Settings;
use crate::error::LoginError;
use crate::identity::{Credential, Identity};

/// Owns the mutual-exclusion gate, the configured identity, and the last
/// published status line.
pub struct SessionManager {
    ca: CaClient,
    settings: Arc<Settings>,
    login_gate: Mutex<()>,
    identity: RwLock<Identity>,
    status_tx: watch::Sender<String>,
}

impl SessionManager {
    pub fn new(settings: Arc<Settings>) -> Arc<Self> {
        let (status_tx, _) = watch::channel("Enter email to check SSH validity".to_string());
        Arc::new(Self {
            ca: CaClient::new(settings.clone()),
            settings,
            login_gate: Mutex::new(()),
            identity: RwLock::new(Identity::default()),
            status_tx,
        })
    }

    pub fn set_identity(&self, identity: Identity) {
        *self.identity.write() = identity;
    }

    pub fn identity(&self) -> Identity {
        self.identity.read().clone()
    }

    /// Last published status line.
    pub fn status(&self) -> String {
        self.status_tx.borrow().clone()
    }

    /// Subscribe to status updates.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.status_tx.subscribe()
    }

    fn publish(&self, status: String) {
        self.status_tx.send_replace(status);
    }

    /// Inspect the configured identity's certificate, publish the rendered
    /// status, and return it. Never errors.
    pub async fn check_status(&self) -> String {
        let identity = self.identity();
        self.refresh(&identity).await
    }

    async fn refresh(&self, identity: &Identity) -> String {
        let status = match self.ca.ssh_expiry(identity).await {
            ExpiryStatus::Valid { expires_at } => format_expiry(expires_at, Utc::now()),
            ExpiryStatus::Unavailable { reason } => reason,
        };
        self.publish(status.clone());
        status
    }

    /// Run one full login flow for the configured identity and return the
    /// refreshed status.
    ///
    /// Rejected immediately when another login holds the gate; concurrent
    /// requests are not queued. An existing still-valid certificate
    /// short-circuits the flow.
    pub async fn login(&self, credential: &Credential) -> Result<String, LoginError> {
        let _gate = self
            .login_gate
            .try_lock()
            .map_err(|_| LoginError::AlreadyInProgress)?;
        let identity = self.identity();

        self.publish("checking existing login…".to_string());
        if let ExpiryStatus::Valid { expires_at } = self.ca.ssh_expiry(&identity).await {
            let status = format_expiry(expires_at, Utc::now());
            self.publish(status.clone());
            return Ok(status);
        }

        self.publish("logging in…".to_string());
        if let Err(e) = self.ca.login(&identity, credential).await {
            self.publish(format!("❌ {e}"));
            return Err(e);
        }

        Ok(self.refresh(&identity).await)
    }

    /// One scheduler tick. Skips silently while a login holds the gate;
    /// holds the gate across the inspect so a tick and a login can never
    /// interleave. Returns whether a refresh ran.
    pub(crate) async fn tick(&self) -> bool {
        match self.login_gate.try_lock() {
            Ok(_gate) => {
                let identity = self.identity();
                self.refresh(&identity).await;
                true
            }
            Err(_) => {
                tracing::debug!("login in progress, skipping status refresh");
                false
            }
        }
    }

    /// Start the periodic background refresh for the configured identity.
    ///
    /// The task refreshes immediately, then at the configured cadence, until
    /// [`StatusUpdater::stop`] is called; the stop signal is observed within
    /// one tick interval.
    pub fn start_status_updates(self: &Arc<Self>) -> StatusUpdater {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let cadence = self.settings.refresh_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!("Status updater started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        manager.tick().await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Status updater stopping");
                            break;
                        }
                    }
                }
            }
        });

        StatusUpdater {
            shutdown_tx,
            handle,
        }
    }
}

/// Handle to the background refresh task.
pub struct StatusUpdater {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl StatusUpdater {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}
