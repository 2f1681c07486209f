use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create config directory: {0}")]
    CreateDir(std::io::Error),
}

/// External tool execution errors
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },

    #[error("'{program}' exited with status {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Login flow errors.
///
/// The `Display` text of each variant is the message shown to the user,
/// so variants carry no internal detail beyond what the caller can act on.
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("A login is already in progress")]
    AlreadyInProgress,

    #[error("CA trust store is not provisioned")]
    TrustStoreMissing,

    #[error("Could not obtain CINECA login URL")]
    NoLoginUrl,

    #[error("Login form not found")]
    FormNotFound,

    #[error("OTP form not found")]
    OtpFormNotFound,

    #[error("OTP failed")]
    OtpFailed,

    #[error("Login tool did not exit after authentication")]
    ToolExit,

    #[error("HTTP error during login: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid login URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}
