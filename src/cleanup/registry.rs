//! Cleanup registry for running invocations
//!
//! Invocations are registered when spawned and removed once their process
//! is confirmed gone. `shutdown` terminates whatever is left; it is
//! run by the [`ShutdownGuard`] on drop and by the signal handler installed
//! with [`install_shutdown_hook`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::executor::result::Shared;
use crate::process::TermSignal;

static GLOBAL: Lazy<Arc<CleanupRegistry>> = Lazy::new(|| Arc::new(CleanupRegistry::new()));

static SIGNAL_HOOK: OnceCell<()> = OnceCell::new();

/// Exit status used after a signal-triggered shutdown
const SIGNAL_EXIT_CODE: i32 = 130;

/// Set of invocations that may still be running
#[derive(Default)]
pub struct CleanupRegistry {
    entries: Mutex<HashMap<u64, Weak<Shared>>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by default executors
    pub fn global() -> Arc<CleanupRegistry> {
        Arc::clone(&GLOBAL)
    }

    pub(crate) fn register(self: &Arc<Self>, shared: &Arc<Shared>) {
        shared.set_registry(self);
        self.entries.lock().insert(shared.id(), Arc::downgrade(shared));
        debug!(id = shared.id(), pid = ?shared.pid(), "Registered for cleanup");
    }

    /// Remove an entry. Unknown ids are ignored.
    pub(crate) fn unregister(&self, id: u64) {
        if self.entries.lock().remove(&id).is_some() {
            debug!(id, "Unregistered from cleanup");
        }
    }

    /// Number of tracked invocations
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Terminate every tracked invocation; returns how many were signalled.
    ///
    /// Entries are taken out under the lock and terminated after it is
    /// released, so invocations finishing concurrently can still unregister.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<Weak<Shared>> = self.entries.lock().drain().map(|(_, w)| w).collect();

        let mut terminated = 0;
        for shared in drained.iter().filter_map(Weak::upgrade) {
            shared.terminate(TermSignal::platform_default());
            terminated += 1;
        }

        if terminated > 0 {
            info!(count = terminated, "Terminated leftover processes");
        }
        terminated
    }
}

/// Runs [`CleanupRegistry::shutdown`] on the global registry when dropped
#[must_use = "dropping the guard immediately runs the cleanup"]
pub struct ShutdownGuard {
    armed: AtomicBool,
}

impl ShutdownGuard {
    /// Run the cleanup now instead of at drop
    pub fn shutdown(&self) -> usize {
        if self.armed.swap(false, Ordering::AcqRel) {
            CleanupRegistry::global().shutdown()
        } else {
            0
        }
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Arrange for the global registry to be drained at program exit.
///
/// Keep the returned guard alive for the lifetime of `main`. When
/// `handle_signals` is set, SIGINT/SIGTERM also drain the registry before
/// exiting; that handler is installed at most once per process.
pub fn install_shutdown_hook(handle_signals: bool) -> ShutdownGuard {
    if handle_signals {
        SIGNAL_HOOK.get_or_init(|| {
            let installed = ctrlc::set_handler(|| {
                CleanupRegistry::global().shutdown();
                std::process::exit(SIGNAL_EXIT_CODE);
            });
            if let Err(e) = installed {
                warn!("Could not install cleanup signal handler: {}", e);
            }
        });
    }

    ShutdownGuard {
        armed: AtomicBool::new(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::encoding::Encoding;
    use crate::executor::result::ProcessResult;

    #[test]
    fn test_register_and_unregister() {
        let registry = Arc::new(CleanupRegistry::new());
        let result = ProcessResult::new("cmd", Encoding::Utf8);

        registry.register(&result.shared);
        assert_eq!(registry.len(), 1);

        registry.unregister(result.shared.id());
        assert!(registry.is_empty());

        // Unknown ids are fine
        registry.unregister(u64::MAX);
    }

    #[test]
    fn test_finish_deregisters() {
        let registry = Arc::new(CleanupRegistry::new());
        let result = ProcessResult::new("cmd", Encoding::Utf8);
        result.shared.attach(999_999_996);
        registry.register(&result.shared);

        result.shared.mark_reaped();
        result.shared.finish(0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dropped_results_are_skipped() {
        let registry = Arc::new(CleanupRegistry::new());
        {
            let result = ProcessResult::new("cmd", Encoding::Utf8);
            registry.register(&result.shared);
        }
        // Drop already terminated and deregistered it
        assert!(registry.is_empty());
        assert_eq!(registry.shutdown(), 0);
    }

    #[test]
    fn test_shutdown_drains_entries() {
        let registry = Arc::new(CleanupRegistry::new());
        let a = ProcessResult::new("a", Encoding::Utf8);
        let b = ProcessResult::new("b", Encoding::Utf8);
        registry.register(&a.shared);
        registry.register(&b.shared);

        assert_eq!(registry.shutdown(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.shutdown(), 0);
    }

    #[test]
    fn test_guard_runs_once() {
        let guard = install_shutdown_hook(false);
        guard.shutdown();
        assert_eq!(guard.shutdown(), 0);
    }
}
