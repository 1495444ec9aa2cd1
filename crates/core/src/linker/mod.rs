//! Linker: for data-origin matches, creates a hardlink/symlink/reflink
//! tree mirroring a candidate's file layout (spec component G).

mod linker;
mod types;

pub use linker::link_candidate;
pub use types::{LinkError, LinkPlan, LinkType, LinkedFile};
