//! One-shot external command execution.
//!
//! All interaction with the CA client goes through [`run_command`]: spawn,
//! optionally feed stdin, wait for exit, capture output as text.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::ProcessError;

/// Run a command to completion and return its trimmed stdout.
///
/// When `stdin` is given it is written to the child before waiting and the
/// pipe is closed so the child sees end-of-input. A non-zero exit status is
/// an error carrying the captured stderr. No process is left running on
/// return, and nothing is retried.
pub async fn run_command(
    program: &str,
    args: &[&str],
    stdin: Option<&str>,
) -> Result<String, ProcessError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| ProcessError::Spawn {
        program: program.to_string(),
        source: e,
    })?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|e| ProcessError::Io {
                    program: program.to_string(),
                    source: e,
                })?;
            // pipe dropped here, closing the child's stdin
        }
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| ProcessError::Io {
            program: program.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(ProcessError::Failed {
            program: program.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
