use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::SecretString;

use hpcauth::config::{Settings, paths};
use hpcauth::identity::{Credential, Identity};
use hpcauth::session::SessionManager;

/// SSH certificate login helper for CINECA HPC clusters
#[derive(Parser)]
#[command(name = "hpcauth", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the current SSH certificate status
    Status {
        /// Account email
        #[arg(long, env = "HPCAUTH_EMAIL")]
        email: String,
    },
    /// Log in to CINECA and obtain an SSH certificate
    Login {
        /// Account email
        #[arg(long, env = "HPCAUTH_EMAIL")]
        email: String,
        /// Account password
        #[arg(long, env = "HPCAUTH_PASSWORD", hide_env_values = true)]
        password: String,
        /// Current one-time code
        #[arg(long, env = "HPCAUTH_OTP", hide_env_values = true)]
        otp: String,
    },
    /// Print the status at the refresh cadence until interrupted
    Watch {
        /// Account email
        #[arg(long, env = "HPCAUTH_EMAIL")]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_dir = paths::ensure_log_dir().ok();
    let _guard = hpcauth::logging::init_logging(log_dir);

    let cli = Cli::parse();
    let settings = Arc::new(Settings::load().context("Failed to load settings")?);
    let manager = SessionManager::new(settings);

    match cli.command {
        Cmd::Status { email } => {
            manager.set_identity(Identity::new(email));
            println!("{}", manager.check_status().await);
        }
        Cmd::Login {
            email,
            password,
            otp,
        } => {
            manager.set_identity(Identity::new(email));
            let credential = Credential::new(
                SecretString::new(password.into()),
                SecretString::new(otp.into()),
            );
            match manager.login(&credential).await {
                Ok(status) => println!("{status}"),
                Err(e) => {
                    eprintln!("❌ {e}");
                    std::process::exit(1);
                }
            }
        }
        Cmd::Watch { email } => {
            manager.set_identity(Identity::new(email));
            let mut status_rx = manager.subscribe();
            let updater = manager.start_status_updates();

            loop {
                tokio::select! {
                    changed = status_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        println!("{}", *status_rx.borrow_and_update());
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }

            updater.stop().await;
        }
    }

    Ok(())
}
