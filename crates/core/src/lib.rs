// Allow some clippy lints that are too noisy for this codebase
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::needless_borrow)]
#![allow(clippy::collapsible_if)]

pub mod auth;
pub mod config;
pub mod db;
pub mod decision;
pub mod indexer;
pub mod linker;
pub mod matcher;
pub mod metafile;
pub mod metrics;
pub mod notifier;
pub mod pipeline;
pub mod scheduler;
pub mod searchee;
pub mod torrent_client;
pub mod torznab;

/// Mock implementations of the core's trait seams, for integration tests.
pub mod testing;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthConfig, AuthError, AuthMethod, AuthRequest,
    Authenticator, Identity, NoneAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, parse_duration, render_default_config, validate_config,
    Action, Config, ConfigError, Duration, SanitizedConfig,
};
pub use db::{Database, DbError, SettingsStore};
pub use decision::{
    Decision, DecisionError, DecisionStore, NewDecision, SqliteDecisionStore, Verdict,
};
pub use indexer::{
    backoff_duration, Indexer, IndexerCaps, IndexerError, IndexerOutcome, IndexerStatus,
    IndexerStore, NewIndexer, SqliteIndexerStore,
};
pub use linker::{link_candidate, LinkError, LinkPlan, LinkType, LinkedFile};
pub use matcher::{
    evaluate, evaluate_preliminary, should_recheck, CandidateMeta, KnownInfoHashes, MatchMode,
    MatchPolicy,
};
pub use metafile::{render_tree, BValue, Metafile, MetafileError, MetafileFile};
pub use notifier::{create_notifier, Notification, NotifierError, NotifierHandle, NotifierWriter};
pub use pipeline::{
    enumerate_searchees, process_candidate, run_bulk_search, run_rss_scan,
    run_single_searchee_search, BulkSearchDeps, BulkSearchSummary, CandidateDeps, CandidateOutcome,
    PipelineConfig, PipelineError, RssCursor, RssCursorStore, RssScanDeps, RssScanSummary,
};
pub use scheduler::{JobName, JobState, Scheduler};
pub use searchee::{
    from_client_entry, from_data_dirs, from_metafile, is_single_episode, ClientTorrentEntry,
    DataSearcheeConfig, ExtensionPolicy, Searchee, SearcheeError, SearcheeFile, SearcheeOrigin,
};
pub use torrent_client::{
    ClientTorrent, DelugeClient, DelugeConfig, GetDownloadDirError, GetDownloadDirOptions,
    InjectOutcome, QBittorrentClient, QBittorrentConfig, RtorrentClient, RtorrentConfig,
    StubClient, TorrentClient, TorrentClientError, TransmissionClient, TransmissionConfig,
};
pub use torznab::{
    build_query_plan, classify_status, QueryKind, QueryPlan, TorznabClient, TorznabError,
    TorznabItem,
};
