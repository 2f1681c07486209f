//! Login identity and secrets.

use secrecy::SecretString;

/// Account identity used as the login key for both the CA client and the
/// identity provider. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }

    /// True when there is no usable email to log in with.
    pub fn is_empty(&self) -> bool {
        self.email.trim().is_empty()
    }
}

/// Secrets for a single login attempt, held only in memory and dropped with
/// the attempt.
pub struct Credential {
    pub password: SecretString,
    pub otp: SecretString,
}

impl Credential {
    pub fn new(password: SecretString, otp: SecretString) -> Self {
        Self { password, otp }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("password", &"[REDACTED]")
            .field("otp", &"[REDACTED]")
            .finish()
    }
}
