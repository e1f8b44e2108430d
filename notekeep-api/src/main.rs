//! # notekeep API server
//!
//! HTTP front for registration, login and owner-scoped note CRUD, backed by a
//! hosted auth provider and notes table (or the local stand-ins).
//!
//! ## Usage
//!
//! ```bash
//! notekeep-api            # serve
//! notekeep-api migrate    # apply the notes schema to DATABASE_URL
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use notekeep_api::{
    app::{build_router, AppState},
    config::Config,
};
use notekeep_shared::db::{
    migrations::{get_migration_status, run_migrations},
    pool::{close_pool, create_pool, DatabaseConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "notekeep-api", version, about = "notekeep HTTP API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Apply the notes schema to the database at DATABASE_URL
    Migrate {
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notekeep_api=debug,notekeep_shared=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Migrate { database_url } => migrate(database_url).await,
    }
}

async fn serve() -> anyhow::Result<()> {
    tracing::info!("notekeep API v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let bind_address = config.bind_address();
    let state = AppState::from_config(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn migrate(database_url: String) -> anyhow::Result<()> {
    let pool = create_pool(DatabaseConfig {
        url: database_url,
        max_connections: 1,
        min_connections: 0,
        ..Default::default()
    })
    .await
    .context("Failed to connect to the database")?;

    run_migrations(&pool).await?;
    let status = get_migration_status(&pool).await?;
    tracing::info!(
        applied = status.applied_migrations,
        latest = ?status.latest_version,
        up_to_date = status.is_up_to_date,
        "Migration finished"
    );

    close_pool(pool).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
