//! # notekeep terminal client
//!
//! ```bash
//! notekeep login --email ada@example.com
//! notekeep notes create --title Groceries --content "Milk, eggs"
//! notekeep notes list --search milk
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=notekeep_client=debug` to see them.

use clap::Parser;
use notekeep_client::commands::{Cli, Terminal};
use notekeep_client::messages;
use notekeep_client::settings::Settings;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notekeep_client=warn,notekeep_shared=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    tracing::debug!(api_url = %settings.api_url, auth = ?settings.auth, "Settings loaded");

    let terminal = Terminal::from_settings(&settings)?;
    if let Err(e) = terminal.start().await {
        tracing::warn!(error = %e, "Could not restore the saved session");
    }

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();

    let result = terminal.run(cli.command, &mut input, &mut out).await;
    terminal.finish();

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("{}", messages::for_client_error(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}
