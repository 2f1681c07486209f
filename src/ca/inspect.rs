//! SSH certificate validity inspection.
//!
//! Asks the CA client for the active certificate of an identity and extracts
//! the end of its validity window. Every failure below the surface is folded
//! into a diagnostic string: a status check must never take down the caller.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use super::CaClient;
use crate::identity::Identity;
use crate::process::run_command;

/// Outcome of a validity check. Exactly one of "a concrete expiry instant"
/// or "a human-readable reason why none is available".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryStatus {
    Valid { expires_at: DateTime<Utc> },
    Unavailable { reason: String },
}

impl ExpiryStatus {
    fn unavailable(reason: &str) -> Self {
        ExpiryStatus::Unavailable {
            reason: reason.to_string(),
        }
    }
}

static VALIDITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Valid:\s+from\s+\S+\s+to\s+(\S+)").unwrap());

impl CaClient {
    /// Look up the expiry of the active SSH certificate for `identity`.
    ///
    /// An empty listing, a failed subprocess, or an unparseable validity
    /// block all come back as [`ExpiryStatus::Unavailable`]; none of them is
    /// an error.
    pub async fn ssh_expiry(&self, identity: &Identity) -> ExpiryStatus {
        if identity.is_empty() {
            return ExpiryStatus::unavailable("Enter email to check SSH validity");
        }

        let raw = match run_command(
            self.step(),
            &["ssh", "list", "--raw", &identity.email],
            None,
        )
        .await
        {
            Ok(raw) if !raw.is_empty() => raw,
            Ok(_) => return ExpiryStatus::unavailable("No active SSH login"),
            Err(e) => {
                tracing::debug!("certificate listing failed: {}", e);
                return ExpiryStatus::unavailable("No active SSH login");
            }
        };

        let info = match run_command(self.step(), &["ssh", "inspect"], Some(&raw)).await {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!("certificate inspection failed: {}", e);
                return ExpiryStatus::unavailable("No active SSH login");
            }
        };

        let Some(end) = VALIDITY_RE.captures(&info).and_then(|c| c.get(1)) else {
            return ExpiryStatus::unavailable("Cannot parse SSH validity");
        };

        match parse_instant(end.as_str()) {
            Some(expires_at) => ExpiryStatus::Valid { expires_at },
            None => ExpiryStatus::unavailable("Cannot parse SSH validity"),
        }
    }
}

/// Parse an ISO-8601 instant; a timestamp without an offset is taken as UTC.
fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render the time remaining until `expires_at`, relative to `now`.
///
/// Zero or negative remaining time renders as expired, never as "0m".
pub fn format_expiry(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (expires_at - now).num_seconds();
    if secs <= 0 {
        return "❌ SSH session expired".to_string();
    }

    let minutes = secs / 60;
    let (hours, minutes) = (minutes / 60, minutes % 60);

    if hours > 0 {
        format!("⏳ SSH will expire in {hours}h {minutes}m")
    } else {
        format!("⏳ SSH will expire in {minutes}m")
    }
}
