//! Applies `SharedOpts` CLI-flag overrides onto a loaded `Config`. Each flag
//! overrides the matching config field only when actually passed.

use std::str::FromStr;

use anyhow::Result;
use xseed_core::{Action, Config, LinkType, MatchMode};

use crate::cli::SharedOpts;

pub fn apply_overrides(mut config: Config, shared: &SharedOpts) -> Result<Config> {
    if !shared.torznab.is_empty() {
        config.torznab = shared.torznab.clone();
    }
    if !shared.data_dirs.is_empty() {
        config.data_dirs = shared.data_dirs.clone();
    }
    if let Some(v) = &shared.torrent_dir {
        config.torrent_dir = Some(v.clone());
    }
    if let Some(v) = &shared.output_dir {
        config.output_dir = v.clone();
    }
    if let Some(v) = &shared.match_mode {
        config.match_mode = MatchMode::from_str(v).map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = &shared.link_dir {
        config.link_dir = Some(v.clone());
    }
    if let Some(v) = &shared.link_type {
        config.link_type = LinkType::from_str(v).map_err(anyhow::Error::msg)?;
    }
    if shared.flat_linking {
        config.flat_linking = true;
    }
    if let Some(v) = shared.max_data_depth {
        config.max_data_depth = v;
    }
    if shared.include_non_videos {
        config.include_non_videos = true;
    }
    if shared.include_single_episodes {
        config.include_single_episodes = true;
    }
    if let Some(v) = shared.fuzzy_size_threshold {
        config.fuzzy_size_threshold = v;
    }
    if let Some(v) = &shared.exclude_older {
        config.exclude_older = Some(xseed_core::Duration::from_str(v).map_err(anyhow::Error::msg)?);
    }
    if let Some(v) = &shared.exclude_recent_search {
        config.exclude_recent_search =
            Some(xseed_core::Duration::from_str(v).map_err(anyhow::Error::msg)?);
    }
    if let Some(v) = &shared.action {
        config.action = Action::from_str(v).map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = &shared.rtorrent_rpc_url {
        config.rtorrent_rpc_url = Some(v.clone());
    }
    if let Some(v) = &shared.qbittorrent_rpc_url {
        config.qbittorrent_rpc_url = Some(v.clone());
    }
    if let Some(v) = &shared.transmission_rpc_url {
        config.transmission_rpc_url = Some(v.clone());
    }
    if let Some(v) = &shared.deluge_rpc_url {
        config.deluge_rpc_url = Some(v.clone());
    }
    if shared.duplicate_categories {
        config.duplicate_categories = true;
    }
    if let Some(v) = &shared.notification_webhook_url {
        config.notification_webhook_url = Some(v.clone());
    }
    if let Some(v) = &shared.delay {
        config.delay = xseed_core::Duration::from_str(v).map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = &shared.snatch_timeout {
        config.snatch_timeout = xseed_core::Duration::from_str(v).map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = &shared.search_timeout {
        config.search_timeout = xseed_core::Duration::from_str(v).map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = shared.search_limit {
        config.search_limit = v;
    }
    if !shared.block_list.is_empty() {
        config.block_list = shared.block_list.clone();
    }
    if !shared.sonarr.is_empty() {
        config.sonarr = shared.sonarr.clone();
    }
    if !shared.radarr.is_empty() {
        config.radarr = shared.radarr.clone();
    }
    if let Some(v) = shared.host {
        config.host = v;
    }
    if shared.no_port {
        config.port = None;
    } else if let Some(v) = shared.port {
        config.port = Some(v);
    }
    if let Some(v) = &shared.search_cadence {
        config.search_cadence = xseed_core::Duration::from_str(v).map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = &shared.rss_cadence {
        config.rss_cadence = xseed_core::Duration::from_str(v).map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = &shared.database_path {
        config.database_path = v.clone();
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_set_fields() {
        let base = Config { torrent_dir: Some("/torrents".into()), ..Config::default() };
        let mut shared = SharedOpts::default();
        shared.match_mode = Some("risky".to_string());
        shared.delay = Some("5s".to_string());

        let merged = apply_overrides(base.clone(), &shared).unwrap();
        assert_eq!(merged.match_mode, MatchMode::Risky);
        assert_eq!(merged.delay.as_std().as_secs(), 5);
        assert_eq!(merged.torrent_dir, base.torrent_dir);
    }

    #[test]
    fn no_port_disables_the_admin_api() {
        let base = Config::default();
        let mut shared = SharedOpts::default();
        shared.no_port = true;
        let merged = apply_overrides(base, &shared).unwrap();
        assert_eq!(merged.port, None);
    }

    #[test]
    fn rejects_invalid_match_mode() {
        let base = Config::default();
        let mut shared = SharedOpts::default();
        shared.match_mode = Some("bogus".to_string());
        assert!(apply_overrides(base, &shared).is_err());
    }
}
