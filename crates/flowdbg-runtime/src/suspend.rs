use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

/// Longest a single suspension may last, whatever timeout the caller asked for.
pub const MAX_SUSPEND_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SuspendOutcome {
    Resumed,
    TimedOut,
}

#[derive(Debug, Default)]
struct GateState {
    /// Set by `resume`, consumed by the next `suspend`.
    resume_pending: bool,
    /// Set once by `release`; every current and future `suspend` returns immediately.
    released: bool,
    parked: usize,
}

/// Blocks an instrumented worker thread until the debug client resumes it.
///
/// A resume that arrives while nobody is parked is remembered, so a worker that reaches
/// [`SuspensionGate::suspend`] afterwards returns immediately instead of waiting out the
/// timeout.
#[derive(Debug, Default)]
pub struct SuspensionGate {
    state: Mutex<GateState>,
    wake: Condvar,
}

impl SuspensionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park the calling thread until [`resume`](Self::resume), [`release`](Self::release) or
    /// until `timeout` (capped at [`MAX_SUSPEND_TIMEOUT`]) elapses.
    pub fn suspend(&self, timeout: Duration) -> SuspendOutcome {
        let deadline = deadline_after(Instant::now(), timeout);
        let mut state = self.state.lock();
        state.parked += 1;

        let outcome = loop {
            if state.released {
                break SuspendOutcome::Resumed;
            }
            if state.resume_pending {
                state.resume_pending = false;
                break SuspendOutcome::Resumed;
            }

            if self.wake.wait_until(&mut state, deadline).timed_out() {
                // A resume may have landed right at the deadline.
                if state.released || std::mem::take(&mut state.resume_pending) {
                    break SuspendOutcome::Resumed;
                }
                break SuspendOutcome::TimedOut;
            }
        };

        state.parked -= 1;
        outcome
    }

    /// Wake one parked thread, or let the next `suspend` pass through if none is parked.
    pub fn resume(&self) {
        let mut state = self.state.lock();
        state.resume_pending = true;
        self.wake.notify_one();
    }

    /// Permanently open the gate, waking every parked thread.
    ///
    /// Returns the number of threads that were parked.
    pub fn release(&self) -> usize {
        let mut state = self.state.lock();
        state.released = true;
        state.resume_pending = false;
        self.wake.notify_all();
        state.parked
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    pub fn parked(&self) -> usize {
        self.state.lock().parked
    }
}

fn deadline_after(now: Instant, timeout: Duration) -> Instant {
    now + timeout.min(MAX_SUSPEND_TIMEOUT)
}
