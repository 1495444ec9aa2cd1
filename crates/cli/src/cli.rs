//! CLI surface (spec component O / §6): argument parsing grounded on
//! `ddonindia-Lodestarr`'s `clap` derive style — a top-level `Cli` with a
//! subcommand enum, and `SharedOpts` flattened into every subcommand that
//! runs a pass (everything short of `gen-config`/`api-key`/`diff`/`tree`).

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xseed")]
#[command(about = "Cross-seed discovery and matching engine")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(short = 'c', long, global = true, env = "XSEED_CONFIG", default_value = "xseed.toml")]
    pub config: PathBuf,

    /// Repeat for more verbose logging (info, debug, trace).
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a commented default config file to stdout.
    GenConfig {
        /// Rewrite path defaults for a container filesystem layout.
        #[arg(long)]
        docker: bool,
    },
    /// Delete cached decisions that never produced a download.
    ClearCache,
    /// Reset every indexer's health status and cooldown.
    ClearIndexerFailures,
    /// Send a test notification to the configured webhook.
    TestNotification {
        #[arg(long)]
        notification_webhook_url: Option<String>,
    },
    /// Compare two metafiles' file trees.
    Diff { a: PathBuf, b: PathBuf },
    /// Print a metafile's file tree.
    Tree { torrent: PathBuf },
    /// Print the persisted admin API key, generating one on first use.
    ApiKey,
    /// Generate and persist a new admin API key.
    ResetApiKey,
    /// Run the scheduler loops and embedded admin API until interrupted.
    Daemon(SharedOpts),
    /// Run a single RSS scan pass and exit.
    Rss(SharedOpts),
    /// Run a single bulk search pass and exit.
    Search(SharedOpts),
    /// Inject one local torrent or file-tree into the configured client.
    Inject {
        /// Path to a `.torrent` file or a directory under `data_dirs`.
        path: PathBuf,
        #[command(flatten)]
        shared: SharedOpts,
    },
}

/// Flags shared by every pass-running subcommand (spec §6 "Shared
/// options"); each overrides the matching `Config` field when set.
#[derive(Args, Clone, Default)]
pub struct SharedOpts {
    /// Torznab indexer URL (repeatable).
    #[arg(long = "torznab")]
    pub torznab: Vec<String>,

    #[arg(long = "data-dir")]
    pub data_dirs: Vec<PathBuf>,

    #[arg(long)]
    pub torrent_dir: Option<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// "safe" | "risky" | "partial"
    #[arg(long)]
    pub match_mode: Option<String>,

    #[arg(long)]
    pub link_dir: Option<PathBuf>,

    /// "hardlink" | "symlink" | "reflink"
    #[arg(long)]
    pub link_type: Option<String>,

    #[arg(long)]
    pub flat_linking: bool,

    #[arg(long)]
    pub max_data_depth: Option<usize>,

    #[arg(long)]
    pub include_non_videos: bool,

    #[arg(long)]
    pub include_single_episodes: bool,

    #[arg(long)]
    pub fuzzy_size_threshold: Option<f64>,

    /// Duration string like "30d"; searchees older than this are skipped.
    #[arg(long)]
    pub exclude_older: Option<String>,

    /// Duration string like "1d"; skip an (searchee, indexer) pair
    /// searched more recently than this.
    #[arg(long)]
    pub exclude_recent_search: Option<String>,

    /// "save" | "inject"
    #[arg(long)]
    pub action: Option<String>,

    #[arg(long)]
    pub rtorrent_rpc_url: Option<String>,
    #[arg(long)]
    pub qbittorrent_rpc_url: Option<String>,
    #[arg(long)]
    pub transmission_rpc_url: Option<String>,
    #[arg(long)]
    pub deluge_rpc_url: Option<String>,

    #[arg(long)]
    pub duplicate_categories: bool,

    #[arg(long)]
    pub notification_webhook_url: Option<String>,

    /// Duration string like "10s"; delay between searchees in a bulk pass.
    #[arg(long)]
    pub delay: Option<String>,

    #[arg(long)]
    pub snatch_timeout: Option<String>,
    #[arg(long)]
    pub search_timeout: Option<String>,

    /// 0 means unlimited.
    #[arg(long)]
    pub search_limit: Option<u32>,

    #[arg(long = "block")]
    pub block_list: Vec<String>,

    #[arg(long = "sonarr")]
    pub sonarr: Vec<String>,
    #[arg(long = "radarr")]
    pub radarr: Vec<String>,

    #[arg(long)]
    pub host: Option<IpAddr>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Disables the embedded admin API.
    #[arg(long)]
    pub no_port: bool,

    #[arg(long)]
    pub search_cadence: Option<String>,
    #[arg(long)]
    pub rss_cadence: Option<String>,

    #[arg(long)]
    pub database_path: Option<PathBuf>,
}
