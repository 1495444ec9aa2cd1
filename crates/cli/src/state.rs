//! Shared application state, constructed once at startup and threaded
//! through every command and the embedded admin API.

use std::sync::Arc;

use xseed_core::{
    Authenticator, CandidateDeps, Config, Database, DecisionStore, IndexerStore, KnownInfoHashes,
    MatchPolicy, NotifierHandle, PipelineConfig, RssCursorStore, SanitizedConfig, Scheduler,
    SettingsStore, TorrentClient, TorznabClient,
};

/// Everything a pass-running command or an admin API handler needs. Built
/// once in `commands::startup` and shared behind an `Arc`.
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    db: Database,
    settings: SettingsStore,
    indexer_store: Arc<dyn IndexerStore>,
    decision_store: Arc<dyn DecisionStore>,
    cursor_store: Arc<RssCursorStore>,
    torznab: Arc<TorznabClient>,
    torrent_client: Arc<dyn TorrentClient>,
    notifier: Option<NotifierHandle>,
    scheduler: Arc<Scheduler>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        db: Database,
        settings: SettingsStore,
        indexer_store: Arc<dyn IndexerStore>,
        decision_store: Arc<dyn DecisionStore>,
        cursor_store: Arc<RssCursorStore>,
        torznab: Arc<TorznabClient>,
        torrent_client: Arc<dyn TorrentClient>,
        notifier: Option<NotifierHandle>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        AppState {
            config,
            authenticator,
            db,
            settings,
            indexer_store,
            decision_store,
            cursor_store,
            torznab,
            torrent_client,
            notifier,
            scheduler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn indexer_store(&self) -> &Arc<dyn IndexerStore> {
        &self.indexer_store
    }

    pub fn decision_store(&self) -> &Arc<dyn DecisionStore> {
        &self.decision_store
    }

    pub fn cursor_store(&self) -> &Arc<RssCursorStore> {
        &self.cursor_store
    }

    pub fn torznab(&self) -> &Arc<TorznabClient> {
        &self.torznab
    }

    pub fn torrent_client(&self) -> &Arc<dyn TorrentClient> {
        &self.torrent_client
    }

    pub fn notifier(&self) -> Option<&NotifierHandle> {
        self.notifier.as_ref()
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Resolves the per-pass worker pool to `min(4, active indexers)`,
    /// re-derived every pass since indexer health changes over time.
    pub async fn pipeline_config(&self) -> PipelineConfig {
        let active = self.indexer_store.list_active().await.unwrap_or_default().len();
        PipelineConfig {
            policy: MatchPolicy {
                mode: self.config.match_mode,
                fuzzy_size_threshold: self.config.fuzzy_size_threshold,
                block_list: self.config.block_list.clone(),
                extensions: self.config.extensions.clone(),
            },
            output_dir: self.config.output_dir.clone(),
            action: self.config.action,
            link_dir: self.config.link_dir.clone(),
            link_type: self.config.link_type,
            flat_linking: self.config.flat_linking,
            delay: self.config.delay.as_std(),
            search_limit: self.config.search_limit,
            exclude_older: self.config.exclude_older.map(|d| d.as_std()),
            exclude_recent_search: self.config.exclude_recent_search.map(|d| d.as_std()),
            worker_pool: active.clamp(1, 4),
        }
    }

    pub async fn candidate_deps(&self) -> CandidateDeps {
        CandidateDeps {
            decision_store: Arc::clone(&self.decision_store),
            torznab: Arc::clone(&self.torznab),
            torrent_client: Arc::clone(&self.torrent_client),
            notifier: self.notifier.clone(),
            config: self.pipeline_config().await,
        }
    }

    /// Infohashes already present in the active client, so the matcher can
    /// reject a candidate that would duplicate an existing download.
    pub async fn known_info_hashes(&self) -> KnownInfoHashes {
        self.torrent_client
            .get_all_torrents()
            .await
            .map(|torrents| {
                torrents.into_iter().map(|t| t.info_hash.to_ascii_lowercase()).collect()
            })
            .unwrap_or_default()
    }
}
