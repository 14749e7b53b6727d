//! Common test utilities for procrun tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use procrun::{CleanupRegistry, Executor, ProcessResult};

/// Generous upper bound for anything that should happen "promptly"
pub const GRACE: Duration = Duration::from_secs(5);

/// Executor with its own registry, so tests cannot interfere with each other
pub fn isolated_executor() -> (Executor, Arc<CleanupRegistry>) {
    let registry = Arc::new(CleanupRegistry::new());
    let executor = Executor::new().with_registry(Arc::clone(&registry));
    (executor, registry)
}

/// Poll `cond` until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

/// Wait until none of `pids` is alive
pub async fn all_dead(pids: &[u32]) -> bool {
    wait_until(GRACE, || pids.iter().all(|&pid| !procrun::process::is_alive(pid))).await
}

/// Read the pid a shell script printed on its first stdout line
pub async fn first_line_pid(result: &ProcessResult) -> Option<u32> {
    let mut pid = None;
    wait_until(GRACE, || {
        pid = result
            .stdout_text()
            .lines()
            .next()
            .and_then(|line| line.trim().parse().ok());
        pid.is_some()
    })
    .await;
    pid
}

/// Starts a background sleep, reports its pid, then waits on it
pub const SPAWNS_GRANDCHILD: &str = "sleep 30 & echo $!; wait";

/// Same, but the parent ignores polite termination signals
pub const SPAWNS_GRANDCHILD_IGNORING_TERM: &str = "trap '' TERM INT HUP; sleep 30 & echo $!; wait";
