mod cli;
mod config;
mod document;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;
use crate::config::Config;
use crate::llm_client::AzureOpenAiClient;
use crate::output::ResultLog;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration must be complete before any document is touched
    let config = Config::from_env()?;

    // Structured logging goes to stderr; stdout carries results only
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting cv-reader v{}", env!("CARGO_PKG_VERSION"));

    let llm = AzureOpenAiClient::new(&config).context("Failed to build HTTP client")?;
    info!(
        "LLM client initialized (deployment: {}, url: {})",
        config.deployment_name,
        llm.url()
    );

    let log_path = cli.log_file.clone().unwrap_or_else(|| config.log_file.clone());
    let mut log = ResultLog::open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let mut stdout = std::io::stdout().lock();
    cli::run(&cli, &llm, &mut log, &mut stdout).await?;

    Ok(())
}

/// Filter used when RUST_LOG is unset: this crate at info, dependencies quiet.
fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_CRATE_NAME"))
}
