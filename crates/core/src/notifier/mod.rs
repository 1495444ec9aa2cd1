//! Fire-and-forget webhook notifications on terminal pipeline outcomes
//! (spec component K).

mod handle;
mod types;
mod writer;

pub use handle::NotifierHandle;
pub use types::{Notification, NotifierError};
pub use writer::{create_notifier, NotifierWriter};
