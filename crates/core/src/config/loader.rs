use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from a TOML file, layered with `XSEED_`-prefixed
/// environment overrides (spec §4.M).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("XSEED_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from a TOML string (useful for testing, and for
/// `gen-config`'s round-trip validation).
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Renders the commented default TOML emitted by `gen-config` (spec §4.M).
/// `docker` rewrites path defaults for a container filesystem layout.
pub fn render_default_config(docker: bool) -> String {
    let (torrent_dir, output_dir, database_path) = if docker {
        ("/data/torrents", "/data/output", "/data/xseed.db")
    } else {
        ("./torrents", "./output", "./xseed.db")
    };

    format!(
        r#"# xseed configuration. See https://github.com/lelloman/xseed for the
# full option reference; every key here has a `--flag` CLI equivalent that
# overrides it, and an `XSEED_<KEY>` environment variable that overrides
# both.

# Torznab indexer endpoints, e.g. "https://example.indexer/api?apikey=...".
torznab = []

# Local sources to cross-seed.
torrent_dir = "{torrent_dir}"
data_dirs = []

# Where confirmed-match artifacts are written.
output_dir = "{output_dir}"

# "safe" | "risky" | "partial"
match_mode = "safe"

# Hardlink/symlink tree destination for data-origin matches.
# link_dir = "/data/links"
link_type = "hardlink"
flat_linking = false
max_data_depth = 2

include_non_videos = false
include_single_episodes = false
fuzzy_size_threshold = 0.02

# "save" | "inject"
action = "save"

# rtorrent_rpc_url = "http://localhost:5000/RPC2"
# qbittorrent_rpc_url = "http://localhost:8080"
# transmission_rpc_url = "http://localhost:9091/transmission/rpc"
# deluge_rpc_url = "http://localhost:8112"
duplicate_categories = false

# notification_webhook_url = "https://example.test/webhook"

delay = "10s"
snatch_timeout = "30s"
search_timeout = "30s"
search_limit = 0
block_list = []

sonarr = []
radarr = []

host = "0.0.0.0"
port = 2468

search_cadence = "1d"
rss_cadence = "10m"

database_path = "{database_path}"
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_minimal_config() {
        let toml = r#"
torznab = ["https://indexer.test/api?apikey=abc"]
output_dir = "/tmp/out"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.torznab.len(), 1);
        assert_eq!(config.output_dir, std::path::PathBuf::from("/tmp/out"));
        assert_eq!(config.port, Some(2468));
    }

    #[test]
    fn missing_file_is_config_invalid() {
        let result = load_config(Path::new("/nonexistent/xseed.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn loads_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"output_dir = "/tmp/out2""#).unwrap();
        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.output_dir, std::path::PathBuf::from("/tmp/out2"));
    }

    #[test]
    fn default_config_round_trips_through_parser() {
        let rendered = render_default_config(false);
        let config = load_config_from_str(&rendered).unwrap();
        assert_eq!(config.match_mode, crate::matcher::MatchMode::Safe);
    }

    #[test]
    fn docker_variant_rewrites_paths() {
        let rendered = render_default_config(true);
        assert!(rendered.contains("/data/torrents"));
    }
}
