use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use flowdbg_runtime::{
    DebugConfig, DebugSessionManager, ExecutionContext, MockChannel, SuspendOutcome,
};

use super::harness::wait_for;

fn manager() -> Arc<DebugSessionManager<MockChannel>> {
    Arc::new(DebugSessionManager::new(
        DebugConfig::default().with_suspend_timeout(Duration::from_secs(30)),
    ))
}

#[test]
fn sessions_do_not_share_breakpoints() {
    let manager = manager();
    let a = manager.open(MockChannel::new("conn-a"), "tenant-a").unwrap();
    let b = manager.open(MockChannel::new("conn-b"), "tenant-b").unwrap();

    a.set_breakpoints("authz-flow", [5]);

    assert!(b.get_breakpoints("authz-flow").is_none());
    assert!(b
        .process_method_entry(ExecutionContext::new("authz-flow", 5))
        .is_none());
    assert!(a
        .process_method_entry(ExecutionContext::new("authz-flow", 5))
        .is_some());
}

#[test]
fn tenant_lookup_never_crosses_tenants() {
    let manager = manager();
    manager.open(MockChannel::new("conn-2"), "tenant-a").unwrap();
    manager.open(MockChannel::new("conn-1"), "tenant-a").unwrap();
    manager.open(MockChannel::new("conn-3"), "tenant-b").unwrap();

    let ids: Vec<_> = manager
        .sessions_for_tenant("tenant-a")
        .iter()
        .map(|session| session.connection_id().to_string())
        .collect();
    assert_eq!(ids, vec!["conn-1", "conn-2"]);
    assert!(manager.sessions_for_tenant("tenant-c").is_empty());
}

#[test]
fn closing_the_connection_releases_a_parked_worker() {
    let manager = manager();
    let session = manager.open(MockChannel::new("conn-close"), "tenant-a").unwrap();
    session.set_breakpoints("token-flow", [8]);

    let worker = {
        let session = Arc::clone(&session);
        thread::spawn(move || {
            let start = Instant::now();
            let outcome = session
                .process_method_entry(ExecutionContext::new("token-flow", 8))
                .expect("breakpoint should stop")
                .halt();
            (outcome, start.elapsed())
        })
    };

    wait_for("worker to park", || session.is_suspended());
    assert!(manager.close("conn-close"));

    let (outcome, elapsed) = worker.join().unwrap();
    assert_eq!(outcome, SuspendOutcome::Resumed);
    assert!(elapsed < Duration::from_secs(5), "{elapsed:?}");
    assert!(manager.is_empty());
}

#[test]
fn close_all_tears_down_every_session() {
    let manager = manager();
    let a = manager.open(MockChannel::new("conn-a"), "tenant-a").unwrap();
    let b = manager.open(MockChannel::new("conn-b"), "tenant-b").unwrap();

    manager.close_all();
    assert!(manager.is_empty());
    assert!(a.is_closed());
    assert!(b.is_closed());
}
