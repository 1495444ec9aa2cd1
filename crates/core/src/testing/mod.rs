//! Mock implementations of core trait seams, for pipeline and CLI tests.

mod mock_torrent_client;

pub use mock_torrent_client::{MockTorrentClient, RecordedInject};
