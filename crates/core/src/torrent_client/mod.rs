//! Client adapter abstraction (spec component J). Exactly one backend is
//! active per process, selected at startup by which `*_rpc_url` is
//! configured: rtorrent, qbittorrent, transmission, deluge, else the
//! "save only" stub (spec §4.J, §9).

mod deluge;
mod qbittorrent;
mod rtorrent;
mod stub;
mod transmission;
mod types;

pub use deluge::{DelugeClient, DelugeConfig};
pub use qbittorrent::{QBittorrentClient, QBittorrentConfig};
pub use rtorrent::{RtorrentClient, RtorrentConfig};
pub use stub::StubClient;
pub use transmission::{TransmissionClient, TransmissionConfig};
pub use types::*;
