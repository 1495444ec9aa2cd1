pub mod daemon;
pub mod inject;
pub mod misc;
pub mod pass;
pub mod startup;

pub use startup::build_state;
