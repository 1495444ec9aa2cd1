use super::{types::Config, ConfigError};

/// Validates configuration after loading and before any network probe
/// (spec §7 "Startup validation"). Any failure here is `CONFIG_INVALID`
/// and causes exit-with-reason before entering any scheduling loop.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.torrent_dir.is_none() && config.data_dirs.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one of torrent_dir or data_dirs must be set".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.fuzzy_size_threshold) {
        return Err(ConfigError::ValidationError(format!(
            "fuzzy_size_threshold must be within 0..=1, got {}",
            config.fuzzy_size_threshold
        )));
    }

    if config.action == super::types::Action::Inject && config.torrent_client_backend().is_none() {
        return Err(ConfigError::ValidationError(
            "action = \"inject\" requires a *_rpc_url to be configured".to_string(),
        ));
    }

    if config.link_dir.is_none() {
        let has_data_origin_inject = !config.data_dirs.is_empty();
        if has_data_origin_inject && config.action == super::types::Action::Inject {
            return Err(ConfigError::ValidationError(
                "link_dir must be set to inject matches from data_dirs".to_string(),
            ));
        }
    }

    if let Some(port) = config.port {
        if port == 0 {
            return Err(ConfigError::ValidationError("port cannot be 0".to_string()));
        }
    }

    if config.max_data_depth == 0 {
        return Err(ConfigError::ValidationError("max_data_depth must be at least 1".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Action;

    fn base() -> Config {
        Config { torrent_dir: Some("/torrents".into()), ..Config::default() }
    }

    #[test]
    fn valid_minimal_config_passes() {
        assert!(validate_config(&base()).is_ok());
    }

    #[test]
    fn no_sources_configured_fails() {
        let config = Config::default();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn fuzzy_threshold_out_of_range_fails() {
        let mut config = base();
        config.fuzzy_size_threshold = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn inject_without_rpc_url_fails() {
        let mut config = base();
        config.action = Action::Inject;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn inject_with_rpc_url_passes() {
        let mut config = base();
        config.action = Action::Inject;
        config.qbittorrent_rpc_url = Some("http://localhost:8080".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_port_fails() {
        let mut config = base();
        config.port = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn zero_max_data_depth_fails() {
        let mut config = base();
        config.max_data_depth = 0;
        assert!(validate_config(&config).is_err());
    }
}
