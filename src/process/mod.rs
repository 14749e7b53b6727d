//! OS process primitives
//!
//! Signal vocabulary, descendant discovery, liveness probes.

pub mod signal;
pub mod tree;

pub use signal::TermSignal;
pub use tree::{descendants, is_alive, signal_process};

#[cfg(unix)]
pub use tree::signal_group;
