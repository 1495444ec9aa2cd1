mod api;
mod cli;
mod commands;
mod config_merge;
mod metrics;
mod rpc_url;
mod state;

use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Command, SharedOpts};
use xseed_core::{load_config, validate_config, Database, SettingsStore};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::GenConfig { docker } => {
            commands::misc::gen_config(docker);
            Ok(())
        }
        Command::ClearCache => {
            let config = load_and_validate(&cli.config, None)?;
            commands::misc::clear_cache(&config.database_path).await
        }
        Command::ClearIndexerFailures => {
            let config = load_and_validate(&cli.config, None)?;
            commands::misc::clear_indexer_failures(&config.database_path).await
        }
        Command::TestNotification { notification_webhook_url } => {
            let config = load_and_validate(&cli.config, None)?;
            commands::misc::test_notification(notification_webhook_url, config.notification_webhook_url).await
        }
        Command::Diff { a, b } => commands::misc::diff(&a, &b),
        Command::Tree { torrent } => commands::misc::tree(&torrent),
        Command::ApiKey => {
            let config = load_and_validate(&cli.config, None)?;
            let db = Database::open(&config.database_path)?;
            commands::misc::api_key(&SettingsStore::new(db))
        }
        Command::ResetApiKey => {
            let config = load_and_validate(&cli.config, None)?;
            let db = Database::open(&config.database_path)?;
            commands::misc::reset_api_key(&SettingsStore::new(db))
        }
        Command::Daemon(shared) => {
            let state = build_state(&cli.config, &shared).await?;
            commands::daemon::run(state).await
        }
        Command::Search(shared) => {
            let state = build_state(&cli.config, &shared).await?;
            commands::pass::run_search(&state).await
        }
        Command::Rss(shared) => {
            let state = build_state(&cli.config, &shared).await?;
            commands::pass::run_rss(&state).await
        }
        Command::Inject { path, shared } => {
            let state = build_state(&cli.config, &shared).await?;
            commands::inject::run(&state, &path).await
        }
    }
}

/// Falls back to the XDG config directory when the default relative
/// `xseed.toml` isn't present in the current directory, so a freshly
/// installed daemon can find a config dropped in the usual place without
/// `--config` on every invocation.
fn resolve_config_path(config_path: &std::path::Path) -> std::path::PathBuf {
    if config_path.exists() || config_path != std::path::Path::new("xseed.toml") {
        return config_path.to_path_buf();
    }
    if let Some(dirs) = directories::ProjectDirs::from("", "", "xseed") {
        let candidate = dirs.config_dir().join("xseed.toml");
        if candidate.exists() {
            return candidate;
        }
    }
    config_path.to_path_buf()
}

fn load_and_validate(
    config_path: &std::path::Path,
    shared: Option<&SharedOpts>,
) -> anyhow::Result<xseed_core::Config> {
    let config_path = resolve_config_path(config_path);
    let config = load_config(&config_path)?;
    let config = match shared {
        Some(shared) => config_merge::apply_overrides(config, shared)?,
        None => config,
    };
    validate_config(&config)?;
    Ok(config)
}

async fn build_state(
    config_path: &std::path::Path,
    shared: &SharedOpts,
) -> anyhow::Result<Arc<state::AppState>> {
    let config = load_and_validate(config_path, Some(shared))?;
    let (state, notifier_writer) = commands::build_state(config).await?;
    if let Some(writer) = notifier_writer {
        tokio::spawn(writer.run());
    }
    Ok(state)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
