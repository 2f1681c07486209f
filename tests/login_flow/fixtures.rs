//! Test fixtures: a fake `step` CLI and a canned identity-provider stub.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use hpcauth::config::Settings;

/// Executable stand-in for the `step` binary.
///
/// Each test writes a shell script playing exactly the CA-client behavior it
/// needs; scripts can leave side files next to themselves to record what
/// they were asked to do.
pub struct FakeStep {
    dir: TempDir,
}

impl FakeStep {
    pub fn new(body: &str) -> Self {
        let dir = TempDir::new().expect("create tempdir");
        let path = dir.path().join("step");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake step");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake step");
        }
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("step")
    }

    pub fn trust_dir(&self) -> PathBuf {
        self.dir.path().join("trust")
    }

    /// Read a side file the script wrote next to itself.
    pub fn side_file(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.dir.path().join(name)).ok()
    }

    /// Settings wired to this fake with test-sized timeouts.
    pub fn settings(&self) -> Settings {
        Settings {
            step_binary: self.path().to_string_lossy().into_owned(),
            trust_dir: Some(self.trust_dir()),
            login_url_timeout_secs: 2,
            subprocess_exit_timeout_secs: 2,
            http_timeout_secs: 5,
            refresh_interval_secs: 1,
            ..Settings::default()
        }
    }
}

/// One request the identity-provider stub saw.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// Method and path, e.g. `POST /auth/otp?session_code=abc`
    pub line: String,
    pub body: String,
    pub has_cookie: bool,
}

/// Minimal identity-provider stub speaking just enough HTTP for the flow:
/// login page, credentials post, OTP post, completion redirect.
pub struct SsoStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

impl SsoStub {
    /// `otp_redirects` controls whether the OTP post answers with a
    /// Location header (the success signal) or a plain 200.
    pub async fn start(otp_redirects: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let base_url = format!("http://{}", listener.local_addr().expect("stub addr"));
        let requests: Arc<Mutex<Vec<SeenRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        let base = base_url.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let seen = seen.clone();
                let base = base.clone();
                tokio::spawn(async move {
                    let _ = serve_one(stream, seen, base, otp_redirects).await;
                });
            }
        });

        Self { base_url, requests }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve_one(
    stream: TcpStream,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    base: String,
    otp_redirects: bool,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut has_cookie = false;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).await?;
        let header = header.trim_end().to_ascii_lowercase();
        if header.is_empty() {
            break;
        }
        if let Some(v) = header.strip_prefix("content-length:") {
            content_length = v.trim().parse().unwrap_or(0);
        }
        if header.starts_with("cookie:") {
            has_cookie = true;
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).await?;
    }
    let body = String::from_utf8_lossy(&body).into_owned();

    seen.lock().unwrap().push(SeenRequest {
        line: format!("{method} {path}"),
        body,
        has_cookie,
    });

    let route = path.split('?').next().unwrap_or_default();
    let response = match (method.as_str(), route) {
        ("GET", "/auth/login") => http_ok(
            r#"<html><body><form id="kc-form-login" method="post" action="/auth/authenticate?session_code=abc&amp;execution=1"></form></body></html>"#,
            Some("AUTH_SESSION=stub; Path=/"),
        ),
        ("POST", "/auth/authenticate") => http_ok(
            r#"<html><body><form id="kc-otp-login-form" method="post" action="/auth/otp?session_code=abc&amp;execution=2"></form></body></html>"#,
            None,
        ),
        ("POST", "/auth/otp") => {
            if otp_redirects {
                format!(
                    "HTTP/1.1 302 Found\r\nLocation: {base}/auth/complete\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                )
            } else {
                http_ok("<html><body>Invalid code</body></html>", None)
            }
        }
        ("GET", "/auth/complete") => http_ok("<html><body>done</body></html>", None),
        _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
    };

    write_half.write_all(response.as_bytes()).await?;
    write_half.shutdown().await?;
    Ok(())
}

fn http_ok(body: &str, set_cookie: Option<&str>) -> String {
    let cookie = set_cookie
        .map(|c| format!("Set-Cookie: {c}\r\n"))
        .unwrap_or_default();
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n{cookie}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Collect the relative paths under `dir`, sorted, for state comparisons.
pub fn list_tree(dir: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_string_lossy().into_owned());
            }
            if path.is_dir() {
                walk(root, &path, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
