//! Trust-store provisioning for the CINECA CA.

use super::CaClient;
use crate::error::ProcessError;
use crate::process::run_command;

impl CaClient {
    /// (Re)provision the local trust store for the configured CA.
    ///
    /// The trust directory is removed first so a stale or partial store
    /// never survives a re-bootstrap; failure to remove it is not fatal.
    /// Safe to call repeatedly. This is a recovery action, invoked only when
    /// the login tool reports an unprovisioned trust store.
    pub async fn bootstrap(&self) -> Result<(), ProcessError> {
        if let Some(trust_dir) = self.settings.trust_dir() {
            if trust_dir.is_dir() {
                if let Err(e) = tokio::fs::remove_dir_all(&trust_dir).await {
                    tracing::warn!(
                        "Could not remove trust directory {}: {}",
                        trust_dir.display(),
                        e
                    );
                }
            }
        }

        let ca_url = format!("--ca-url={}", self.settings.ca_url);
        let fingerprint = format!("--fingerprint={}", self.settings.ca_fingerprint);
        run_command(self.step(), &["ca", "bootstrap", &ca_url, &fingerprint], None).await?;

        tracing::info!("CA trust store bootstrapped for {}", self.settings.ca_url);
        Ok(())
    }
}
