use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use flowdbg_runtime::{DebugConfig, DebugSession, MockChannel};

pub const TENANT: &str = "carbon.super";

pub fn session_with_timeout(connection: &str, timeout: Duration) -> Arc<DebugSession<MockChannel>> {
    Arc::new(DebugSession::with_channel(
        MockChannel::new(connection),
        TENANT,
        DebugConfig::default().with_suspend_timeout(timeout),
    ))
}

pub fn session(connection: &str) -> Arc<DebugSession<MockChannel>> {
    session_with_timeout(connection, Duration::from_secs(5))
}

/// Poll `condition` until it holds, failing the test after a generous bound.
pub fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "timed out waiting for {what}"
        );
        thread::sleep(Duration::from_millis(1));
    }
}
