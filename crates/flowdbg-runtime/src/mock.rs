use std::io;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::channel::DebugChannel;
use crate::session::StoppedEvent;

/// Deterministic, in-memory channel test double.
///
/// Records every event it is asked to send so tests can observe stops from another thread.
#[derive(Debug, Default)]
pub struct MockChannel {
    id: String,
    events: Mutex<Vec<StoppedEvent>>,
    sent: Condvar,
    fail_sends: Mutex<bool>,
}

impl MockChannel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Make every following `send_stopped` fail with `BrokenPipe`.
    pub fn fail_sends(&self) {
        *self.fail_sends.lock() = true;
    }

    pub fn stopped_events(&self) -> Vec<StoppedEvent> {
        self.events.lock().clone()
    }

    /// Block until at least `count` events were sent, returning the `count`-th one.
    pub fn wait_for_stopped(&self, count: usize, timeout: Duration) -> Option<StoppedEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock();
        while events.len() < count {
            if self.sent.wait_until(&mut events, deadline).timed_out() {
                break;
            }
        }
        count.checked_sub(1).and_then(|idx| events.get(idx).cloned())
    }
}

impl DebugChannel for MockChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn send_stopped(&self, event: &StoppedEvent) -> io::Result<()> {
        if *self.fail_sends.lock() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock channel closed"));
        }
        self.events.lock().push(event.clone());
        self.sent.notify_all();
        Ok(())
    }
}
