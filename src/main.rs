use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratebook::config::Config;
use ratebook::AppState;

#[derive(Parser, Debug)]
#[command(name = "ratebook")]
#[command(author, version, about = "A small review-and-rating service", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ratebook.toml", env = "RATEBOOK_CONFIG")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the listen port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Seed a demo user and sample businesses on startup
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.seed {
        config.database.seed_demo_data = true;
    }

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ratebook v{}", env!("CARGO_PKG_VERSION"));

    // Initialize database
    let db = ratebook::db::init(&config.database).await?;

    // Ensure the bootstrap admin exists
    match config.auth.admin_password.as_deref() {
        Some(password) if !password.is_empty() => {
            ratebook::db::ensure_admin_user(&db, &config.auth.admin_email, password).await?;
        }
        _ => tracing::warn!(
            "No admin password configured (set {}); no admin account was created",
            ratebook::config::ADMIN_PASSWORD_ENV
        ),
    }

    if config.database.seed_demo_data {
        ratebook::db::seed_demo_data(&db).await?;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create app state and router
    let state = Arc::new(AppState::new(config, db));
    let app = ratebook::api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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

    tracing::info!("Shutdown signal received");
}
