//! Searchee model: a uniform view over "something we want to cross-seed"
//! (spec component B).

mod construct;
mod filters;
mod types;

pub use construct::{
    from_client_entry, from_data_dirs, from_metafile, ClientTorrentEntry, DataSearcheeConfig,
};
pub use filters::{is_single_episode, ExtensionPolicy};
pub use types::{Searchee, SearcheeError, SearcheeFile, SearcheeOrigin};
