//! gatehouse - a terminal front end for account sign-up, login and profile
//! editing against the identity service.
//!
//! The session is restored from storage once at startup; every command then
//! works through the same session context.

mod app;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, ProfileArgs};
use gatehouse_core::config::{Config, API_URL_ENV};

/// Log file written inside the data directory
const LOG_FILE: &str = "gatehouse.log";

#[derive(Parser)]
#[command(name = "gatehouse", version, about = "Sign up, log in and edit your profile")]
struct Cli {
    /// Identity service base URL
    #[arg(long, global = true, env = API_URL_ENV)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show who is signed in
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Log out and forget the stored session
    Logout {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Create a new account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
    },
    /// Edit the signed-in user's profile
    Profile(ProfileArgs),
    /// Replace the stored access token with one obtained from a refresh
    SetToken { token: String },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config ({}), using defaults", e);
            Config::default()
        }
    };

    let log_dir = config
        .data_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let _guard = init_tracing(log_dir.as_deref());
    info!("gatehouse starting");

    let mut app = App::new(config, cli.api_url)?;

    let result = match cli.command {
        Command::Status { json } => app.status(json),
        Command::Login { email } => app.login(email).await,
        Command::Logout { yes } => app.logout(yes),
        Command::Signup { email, username } => app.signup(email, username).await,
        Command::Profile(args) => app.update_profile(args).await,
        Command::SetToken { token } => app.set_token(token),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
