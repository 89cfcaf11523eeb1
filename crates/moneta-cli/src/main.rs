//! Moneta CLI - drive the Moneta personal-finance API from a terminal.
//!
//! Logs in, keeps the session between runs, and exposes the raw
//! `get`/`post`/`put`/`delete` verbs so any backend endpoint can be exercised.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moneta_core::api::NO_BODY;
use moneta_core::auth::CredentialStore;
use moneta_core::models::RegisterRequest;
use moneta_core::{ApiClient, ApiError, AuthError, Authenticator, Config, SessionStore};
use serde_json::Value;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directory for log files; logs go to stderr when unset
const LOG_DIR_ENV: &str = "MONETA_LOG_DIR";

#[derive(Parser)]
#[command(name = "moneta")]
#[command(about = "Command-line client for the Moneta personal-finance API", long_about = None)]
struct Cli {
    /// Override the primary API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Never retry on the fallback host
    #[arg(long, global = true)]
    no_fallback: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and keep the session for later commands
    Login {
        /// Account email (defaults to the last one used)
        email: Option<String>,
        /// Remember the password in the OS keychain
        #[arg(long)]
        remember: bool,
        /// Forget any remembered password before logging in
        #[arg(long, conflicts_with = "remember")]
        forget: bool,
    },
    /// Create an account (does not log in)
    Register {
        /// Display name
        name: String,
        /// Account email
        email: String,
    },
    /// Log out and drop the cached session
    Logout,
    /// Show whether a session is cached
    Status,
    /// Show the logged-in user, refreshed from the backend
    Whoami,
    /// GET an endpoint
    Get { path: String },
    /// POST to an endpoint with an optional JSON body
    Post { path: String, body: Option<String> },
    /// PUT to an endpoint with an optional JSON body
    Put { path: String, body: Option<String> },
    /// DELETE an endpoint
    Delete { path: String },
    /// Print the effective configuration
    Config,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "moneta.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

/// Print an error, with status and payload for API failures.
fn report(err: &anyhow::Error) {
    let api_err = err.downcast_ref::<ApiError>().or_else(|| match err.downcast_ref::<AuthError>() {
        Some(AuthError::Api(api)) => Some(api),
        _ => None,
    });

    match api_err {
        Some(api) => {
            eprintln!("Error: {} (status {})", api, api.status());
            let data = api.data();
            if data.as_object().is_some_and(|o| !o.is_empty()) {
                if let Ok(pretty) = serde_json::to_string_pretty(&data) {
                    eprintln!("{}", pretty);
                }
            }
            if api.is_session_expired() {
                eprintln!("Run `moneta login` to sign in again.");
            }
        }
        None => eprintln!("Error: {:#}", err),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if cli.no_fallback {
        config.api.fallback_url = None;
    }

    let session = SessionStore::open(&config.cache_dir()?)?;
    let api = ApiClient::new(&config.api, session)?;
    let auth = Authenticator::new(api.clone());
    debug!(base_url = api.base_url(), fallback_url = ?api.fallback_url(), "Client ready");

    match cli.command {
        Commands::Login {
            email,
            remember,
            forget,
        } => login(&auth, &mut config, email, remember, forget).await?,
        Commands::Register { name, email } => {
            let password = rpassword::prompt_password(format!("Choose a password for {}: ", email))
                .context("Failed to read password")?;
            let request = RegisterRequest {
                name,
                email,
                password,
            };
            let message = auth.register(&request).await?;
            println!("{}", message.as_deref().unwrap_or("Account created."));
        }
        Commands::Logout => {
            auth.logout().await?;
            println!("Logged out.");
        }
        Commands::Status => {
            if auth.is_logged_in() {
                let name = auth
                    .current_user()?
                    .and_then(|u| u.name.or(u.email))
                    .unwrap_or_else(|| "unknown user".to_string());
                println!("Logged in as {}", name);
            } else {
                println!("Not logged in.");
            }
        }
        Commands::Whoami => {
            auth.require_auth()?;
            match auth.load_user().await? {
                Some(user) => print_json(&serde_json::to_value(&user)?)?,
                None => println!("Not logged in."),
            }
        }
        Commands::Get { path } => {
            let value: Value = api.get(&path).await?;
            print_json(&value)?;
        }
        Commands::Post { path, body } => {
            let body = parse_body(body.as_deref())?;
            let value: Value = match body {
                Some(ref body) => api.post(&path, Some(body)).await?,
                None => api.post(&path, NO_BODY).await?,
            };
            print_json(&value)?;
        }
        Commands::Put { path, body } => {
            let body = parse_body(body.as_deref())?;
            let value: Value = match body {
                Some(ref body) => api.put(&path, Some(body)).await?,
                None => api.put(&path, NO_BODY).await?,
            };
            print_json(&value)?;
        }
        Commands::Delete { path } => {
            let value: Value = api.delete(&path).await?;
            print_json(&value)?;
        }
        Commands::Config => {
            print_json(&serde_json::to_value(&config)?)?;
            println!("config file: {}", Config::config_path()?.display());
        }
    }

    Ok(())
}

async fn login(
    auth: &Authenticator,
    config: &mut Config,
    email: Option<String>,
    remember: bool,
    forget: bool,
) -> Result<()> {
    let email = email
        .or_else(|| config.last_email.clone())
        .context("No email given and none remembered - run `moneta login <email>`")?;

    if forget {
        CredentialStore::delete(&email)?;
    }

    let remembered = if forget {
        None
    } else {
        CredentialStore::get_password(&email).unwrap_or_else(|e| {
            warn!(error = %e, "Keychain unavailable");
            None
        })
    };
    let used_remembered = remembered.is_some();
    let password = match remembered {
        Some(password) => password,
        None => rpassword::prompt_password(format!("Password for {}: ", email))
            .context("Failed to read password")?,
    };

    let data = match auth.login(&email, &password).await {
        Ok(data) => data,
        Err(AuthError::Rejected(message)) if used_remembered => {
            // A remembered password that no longer works is forgotten.
            if let Err(e) = CredentialStore::delete(&email) {
                warn!(error = %e, "Failed to forget rejected password");
            }
            anyhow::bail!("{} (remembered password forgotten)", message);
        }
        Err(e) => return Err(e.into()),
    };

    if remember {
        CredentialStore::store(&email, &password)?;
    }
    config.last_email = Some(email.clone());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    let name = data
        .user
        .get("nome")
        .or_else(|| data.user.get("name"))
        .and_then(Value::as_str)
        .unwrap_or(&email);
    info!("Login succeeded");
    println!("Logged in as {}", name);
    Ok(())
}

fn parse_body(raw: Option<&str>) -> Result<Option<Value>> {
    raw.map(|raw| serde_json::from_str(raw).context("Body is not valid JSON"))
        .transpose()
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
