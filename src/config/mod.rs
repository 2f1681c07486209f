//! Settings for the CINECA login flow, stored in settings.toml.
//!
//! Every field has a default reproducing the production CINECA constants, so
//! a missing or empty settings file yields a working configuration.

pub mod paths;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// CINECA certificate authority endpoint.
pub const CINECA_CA_URL: &str = "https://sshproxy.hpc.cineca.it";

/// SHA-256 fingerprint of the CINECA CA root certificate.
pub const CINECA_CA_FINGERPRINT: &str =
    "2ae1543202304d3f434bdc1a2c92eff2cd2b02110206ef06317e70c1c1735ecd";

/// CINECA single-sign-on origin.
pub const CINECA_SSO_BASE_URL: &str = "https://sso.hpc.cineca.it";

/// Name of the CA provisioner handling the SSO flow.
pub const CINECA_PROVISIONER: &str = "cineca-hpc";

fn default_step_binary() -> String {
    "step".to_string()
}

fn default_ca_url() -> String {
    CINECA_CA_URL.to_string()
}

fn default_ca_fingerprint() -> String {
    CINECA_CA_FINGERPRINT.to_string()
}

fn default_sso_base_url() -> String {
    CINECA_SSO_BASE_URL.to_string()
}

fn default_provisioner() -> String {
    CINECA_PROVISIONER.to_string()
}

fn default_login_url_timeout() -> u64 {
    30
}

fn default_subprocess_exit_timeout() -> u64 {
    10
}

fn default_http_timeout() -> u64 {
    30
}

fn default_refresh_interval() -> u64 {
    30
}

/// Application-wide settings stored in settings.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path or name of the CA client binary
    #[serde(default = "default_step_binary")]
    pub step_binary: String,

    #[serde(default = "default_ca_url")]
    pub ca_url: String,

    #[serde(default = "default_ca_fingerprint")]
    pub ca_fingerprint: String,

    #[serde(default = "default_sso_base_url")]
    pub sso_base_url: String,

    #[serde(default = "default_provisioner")]
    pub provisioner: String,

    /// How long to watch the login tool's output for the authorization
    /// URL, per attempt
    #[serde(default = "default_login_url_timeout")]
    pub login_url_timeout_secs: u64,

    /// How long the login tool may take to exit once authentication
    /// completed
    #[serde(default = "default_subprocess_exit_timeout")]
    pub subprocess_exit_timeout_secs: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Cadence of the background status refresh
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Override for the CA client's trust directory (defaults to ~/.step)
    #[serde(default)]
    pub trust_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            step_binary: default_step_binary(),
            ca_url: default_ca_url(),
            ca_fingerprint: default_ca_fingerprint(),
            sso_base_url: default_sso_base_url(),
            provisioner: default_provisioner(),
            login_url_timeout_secs: default_login_url_timeout(),
            subprocess_exit_timeout_secs: default_subprocess_exit_timeout(),
            http_timeout_secs: default_http_timeout(),
            refresh_interval_secs: default_refresh_interval(),
            trust_dir: None,
        }
    }
}

impl Settings {
    /// Load from file, creating default if not exists
    pub fn load() -> Result<Self, ConfigError> {
        let path = paths::settings_file().ok_or_else(|| ConfigError::ReadFile {
            path: PathBuf::from("settings.toml"),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine settings file path",
            ),
        })?;

        if !path.exists() {
            let settings = Self::default();
            settings.save()?;
            return Ok(settings);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Save to file
    pub fn save(&self) -> Result<(), ConfigError> {
        paths::ensure_config_dir().map_err(ConfigError::CreateDir)?;

        let path = paths::settings_file().ok_or_else(|| ConfigError::WriteFile {
            path: PathBuf::from("settings.toml"),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine settings file path",
            ),
        })?;

        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(&path, content).map_err(|e| ConfigError::WriteFile { path, source: e })
    }

    /// Trust directory the CA client writes its bootstrap material to
    pub fn trust_dir(&self) -> Option<PathBuf> {
        self.trust_dir.clone().or_else(paths::default_trust_dir)
    }

    pub fn login_url_timeout(&self) -> Duration {
        Duration::from_secs(self.login_url_timeout_secs)
    }

    pub fn subprocess_exit_timeout(&self) -> Duration {
        Duration::from_secs(self.subprocess_exit_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}
