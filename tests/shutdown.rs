//! Process-exit cleanup through the global registry.
//!
//! Kept in its own test binary: draining the global registry would kill
//! detached processes belonging to unrelated tests.

#![cfg(unix)]

mod common;

use common::{all_dead, first_line_pid};
use procrun::{install_shutdown_hook, CleanupRegistry, Executor, Invocation};

#[tokio::test]
async fn test_shutdown_guard_kills_detached_invocations() {
    let guard = install_shutdown_hook(false);
    let executor = Executor::new();

    let results: Vec<_> = (0..4)
        .map(|_| {
            executor
                .spawn(&Invocation::shell("sleep 30 & echo $!; sleep 30; wait"))
                .unwrap()
        })
        .collect();
    let mut pids: Vec<u32> = results.iter().filter_map(|r| r.pid()).collect();
    for result in &results {
        pids.push(first_line_pid(result).await.expect("grandchild pid"));
    }
    assert_eq!(pids.len(), 8);
    assert_eq!(CleanupRegistry::global().len(), 4);

    drop(guard);

    assert!(CleanupRegistry::global().is_empty());
    assert!(all_dead(&pids).await);
    for result in &results {
        result.wait().await;
        assert!(result.exit_code().is_some());
    }
}
