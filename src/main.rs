//! CLI entry point for the family video cloud.

use anyhow::{Context, Result};
use clap::Parser;
use family_cloud_core::AppContext;
use tracing::debug;

mod app_config;
mod cli;
mod commands;

use app_config::{CliOverrides, VerbositySetting};
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Config is read before tracing so its verbosity can set the default level
    let loaded = app_config::load_config(cli.config.as_deref())?;
    let overrides = CliOverrides {
        storage_path: cli.storage_path.clone(),
        api_base_url: cli.api_url.clone(),
    };
    let settings = app_config::resolve_settings(&loaded, &overrides)?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => settings
                .verbosity
                .map_or("info", VerbositySetting::log_level),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?cli, "CLI arguments parsed");
    debug!(
        config = ?loaded.path,
        loaded_from_file = loaded.loaded_from_file,
        storage = %settings.storage_path.display(),
        api = %settings.api.base_url,
        verbosity = settings.verbosity.map(VerbositySetting::as_str),
        "settings resolved"
    );

    let ctx = AppContext::open(&settings.storage_path, settings.api, settings.hosted_ui)
        .await
        .with_context(|| {
            format!(
                "Failed to initialize with storage '{}'",
                settings.storage_path.display()
            )
        })?;

    debug!(
        max_retries = ctx.api().retry_policy().max_retries(),
        base_delay_ms = ctx.api().retry_policy().base_delay().as_millis(),
        "API client ready"
    );

    commands::dispatch(&ctx, &cli.command, cli.quiet).await
}
