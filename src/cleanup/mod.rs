//! Process-wide cleanup of running invocations

pub mod registry;

pub use registry::{install_shutdown_hook, CleanupRegistry, ShutdownGuard};
