//! Interactive SSH login orchestration.
//!
//! Drives `step ssh login` to the point where it prints the identity
//! provider's authorization URL, completes the browser leg of the flow over
//! HTTP, then waits for the tool to collect the issued certificate.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout};

use super::CaClient;
use crate::error::{LoginError, ProcessError};
use crate::identity::{Credential, Identity};
use crate::sso::SsoClient;

impl CaClient {
    /// Obtain a fresh SSH certificate for `identity`.
    ///
    /// On an unprovisioned trust store the flow bootstraps the CA trust
    /// material and retries once; a second failure of the same kind is
    /// fatal. Each attempt gets its own URL-observation deadline.
    pub async fn login(
        &self,
        identity: &Identity,
        credential: &Credential,
    ) -> Result<(), LoginError> {
        let mut bootstrapped = false;
        loop {
            match self.login_attempt(identity, credential).await {
                Err(LoginError::TrustStoreMissing) if !bootstrapped => {
                    bootstrapped = true;
                    tracing::info!("Trust store not provisioned, bootstrapping and retrying");
                    self.bootstrap().await?;
                }
                result => return result,
            }
        }
    }

    async fn login_attempt(
        &self,
        identity: &Identity,
        credential: &Credential,
    ) -> Result<(), LoginError> {
        let mut child = self.spawn_login_tool(identity)?;
        let mut lines = line_channel(&mut child);

        let auth_url = match self.watch_for_auth_url(&mut lines).await {
            Ok(url) => url,
            Err(e) => {
                let _ = child.kill().await;
                return Err(e);
            }
        };
        tracing::info!("Obtained identity-provider authorization URL");

        // Keep draining the tool's output so it can never block on a full
        // pipe while the HTTP exchange runs.
        tokio::spawn(async move { while lines.recv().await.is_some() {} });

        let sso = SsoClient::new(&self.settings.sso_base_url, self.settings.http_timeout())?;
        if let Err(e) = sso.authenticate(&auth_url, identity, credential).await {
            let _ = child.kill().await;
            return Err(e);
        }

        // The provider session is established; the tool should now receive
        // its certificate and exit on its own.
        match timeout(self.settings.subprocess_exit_timeout(), child.wait()).await {
            Ok(Ok(_status)) => {
                tracing::info!("Login completed for {}", identity.email);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                Err(LoginError::Process(ProcessError::Io {
                    program: self.step().to_string(),
                    source: e,
                }))
            }
            Err(_elapsed) => {
                let _ = child.kill().await;
                Err(LoginError::ToolExit)
            }
        }
    }

    fn spawn_login_tool(&self, identity: &Identity) -> Result<Child, LoginError> {
        let mut cmd = Command::new(self.step());
        cmd.args([
            "ssh",
            "login",
            &identity.email,
            "--provisioner",
            &self.settings.provisioner,
        ])
        // Suppress the browser launch: with BROWSER=echo the tool prints
        // the authorization URL instead of opening it.
        .env("BROWSER", "echo")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| ProcessError::Spawn {
            program: self.step().to_string(),
            source: e,
        })?;
        Ok(child)
    }

    /// Read the tool's output until it prints the authorization URL or
    /// reports an unprovisioned trust store, within one wall-clock deadline.
    ///
    /// A tool that exits (both pipes close) without printing either signal
    /// fails the same way as one that never prints it.
    async fn watch_for_auth_url(
        &self,
        lines: &mut mpsc::Receiver<String>,
    ) -> Result<String, LoginError> {
        let deadline = Instant::now() + self.settings.login_url_timeout();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LoginError::NoLoginUrl);
            }

            match timeout(remaining, lines.recv()).await {
                Err(_elapsed) => return Err(LoginError::NoLoginUrl),
                Ok(None) => return Err(LoginError::NoLoginUrl),
                Ok(Some(line)) => {
                    tracing::debug!("login tool: {}", line);
                    if line.contains("requires the") {
                        return Err(LoginError::TrustStoreMissing);
                    }
                    if let Some(url) = extract_auth_url(&line, &self.settings.sso_base_url) {
                        return Ok(url.to_string());
                    }
                }
            }
        }
    }
}

/// Forward stdout and stderr of the child into a single line channel.
fn line_channel(child: &mut Child) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(64);
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, tx));
    }
    rx
}

async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

/// Extract the authorization URL from an output line: the identity-provider
/// origin through the next whitespace.
fn extract_auth_url<'a>(line: &'a str, base: &str) -> Option<&'a str> {
    let start = line.find(base)?;
    let tail = &line[start..];
    let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
    Some(&tail[..end])
}
