//! Tether Server: real-time WebSocket connection hub
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use tether_auth::{ConfigCredentialVerifier, PasswordHasher};
use tether_core::config::AppConfig;
use tether_core::error::AppError;
use tether_realtime::RealtimeEngine;
use tether_realtime::handlers::default_router;

/// Tether: real-time WebSocket connection hub
#[derive(Debug, Parser)]
#[command(name = "tether-server", version, about, long_about = None)]
struct Cli {
    /// Configuration overlay to load from `config/{env}.toml`
    #[arg(short, long, env = "TETHER_ENV", default_value = "development")]
    env: String,

    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the hub
    Serve,
    /// Print an Argon2 hash for an `[[auth.users]]` entry
    HashPassword {
        /// Plaintext password
        password: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(Commands::HashPassword { password }) = &cli.command {
        match PasswordHasher::new().hash_password(password) {
            Ok(hash) => println!("{hash}"),
            Err(e) => {
                eprintln!("Failed to hash password: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match AppConfig::load(&cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Tether v{}", env!("CARGO_PKG_VERSION"));

    if config.server.tls.enabled {
        return Err(AppError::configuration(
            "Built-in TLS is not supported; terminate TLS in a reverse proxy and set server.tls.enabled = false",
        ));
    }

    let verifier = ConfigCredentialVerifier::new(&config.auth.users);
    if verifier.user_count() == 0 {
        tracing::warn!("No users configured under [auth.users]; every login will be rejected");
    }

    let engine = RealtimeEngine::new(config.realtime.clone(), &config.auth, default_router()?)?;
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let addr = config.server.bind_address();
    let app_state = tether_api::AppState::new(config, engine.clone(), Arc::new(verifier));
    let app = tether_api::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Tether server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    engine.shutdown(grace).await?;

    tracing::info!("Tether server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
