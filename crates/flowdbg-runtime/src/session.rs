use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use flowdbg_config::DebugConfig;
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::Span;

use crate::breakpoints::{BreakpointRegistry, BreakpointSet};
use crate::channel::DebugChannel;
use crate::context::{ExecutionContext, Line};
use crate::decision::{decide, ProcessingResult};
use crate::error::{DebugError, DebugResult};
use crate::suspend::{SuspendOutcome, SuspensionGate, MAX_SUSPEND_TIMEOUT};
use crate::variables::{VariableCapture, VariableCaptures};

const UNBOUND_CONNECTION: &str = "<unbound>";

/// Payload of the "stopped" event sent to the client when a breakpoint is hit.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEvent {
    pub reason: String,
    pub tenant: String,
    pub resource: String,
    pub line: Line,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Locations of the breakpoint set that matched.
    pub breakpoints: Vec<Line>,
    pub variables: BTreeMap<String, Value>,
    pub locals: BTreeMap<String, Value>,
}

/// Debug state for one remote client connection.
///
/// Worker threads report method entries through [`process_method_entry`]; the client's
/// message handler drives [`set_breakpoints`] and [`resume`]. Nothing here is shared with
/// other sessions.
///
/// [`process_method_entry`]: DebugSession::process_method_entry
/// [`set_breakpoints`]: DebugSession::set_breakpoints
/// [`resume`]: DebugSession::resume
pub struct DebugSession<C: DebugChannel> {
    channel: OnceLock<C>,
    tenant: String,
    config: DebugConfig,
    breakpoints: BreakpointRegistry,
    current_context: RwLock<Option<Arc<ExecutionContext>>>,
    variables: Mutex<VariableCaptures>,
    gate: SuspensionGate,
    /// Held for the whole time a worker is stopped, so only one worker per session can be
    /// parked and the current context stays put while the client inspects it.
    stop_lock: Mutex<()>,
    /// Thread holding the current [`PendingStop`], if any.
    stop_owner: Mutex<Option<ThreadId>>,
    closed: AtomicBool,
    span: Span,
}

impl<C: DebugChannel> DebugSession<C> {
    pub fn new(tenant: impl Into<String>, config: DebugConfig) -> Self {
        Self::from_parts(OnceLock::new(), tenant.into(), config)
    }

    pub fn with_channel(channel: C, tenant: impl Into<String>, config: DebugConfig) -> Self {
        Self::from_parts(OnceLock::from(channel), tenant.into(), config)
    }

    fn from_parts(channel: OnceLock<C>, tenant: String, config: DebugConfig) -> Self {
        let span = tracing::info_span!(
            "debug_session",
            tenant = %tenant,
            connection = tracing::field::Empty
        );
        if let Some(channel) = channel.get() {
            span.record("connection", channel.id());
        }
        Self {
            channel,
            tenant,
            config,
            breakpoints: BreakpointRegistry::new(),
            current_context: RwLock::new(None),
            variables: Mutex::new(VariableCaptures::default()),
            gate: SuspensionGate::new(),
            stop_lock: Mutex::new(()),
            stop_owner: Mutex::new(None),
            closed: AtomicBool::new(false),
            span,
        }
    }

    /// Replace the span every diagnostic of this session is reported under.
    pub fn with_span(mut self, span: Span) -> Self {
        if let Some(channel) = self.channel.get() {
            span.record("connection", channel.id());
        }
        self.span = span;
        self
    }

    pub fn bind_channel(&self, channel: C) -> DebugResult<()> {
        let id = channel.id().to_string();
        self.channel
            .set(channel)
            .map_err(|_| DebugError::ChannelAlreadyBound)?;
        self.span.record("connection", id.as_str());
        Ok(())
    }

    pub fn channel(&self) -> Option<&C> {
        self.channel.get()
    }

    pub fn connection_id(&self) -> &str {
        self.channel
            .get()
            .map(|channel| channel.id())
            .unwrap_or(UNBOUND_CONNECTION)
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn config(&self) -> &DebugConfig {
        &self.config
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn set_breakpoints(&self, resource: &str, locations: impl IntoIterator<Item = Line>) {
        if self.is_closed() {
            tracing::debug!(parent: &self.span, resource, "ignoring breakpoints for closed session");
            return;
        }
        let set = self.breakpoints.set_breakpoints(resource, locations);
        tracing::debug!(
            parent: &self.span,
            resource,
            locations = ?set.locations(),
            "breakpoints updated"
        );
    }

    pub fn get_breakpoints(&self, resource: &str) -> Option<Arc<BreakpointSet>> {
        self.breakpoints.get_breakpoints(resource)
    }

    /// Every registered breakpoint set.
    ///
    /// Legacy diagnostic view; stop decisions only look at the snapshot's own resource.
    pub fn list_all(&self) -> Vec<Arc<BreakpointSet>> {
        self.breakpoints.list_all()
    }

    pub fn current_context(&self) -> Option<Arc<ExecutionContext>> {
        self.current_context.read().clone()
    }

    pub fn register_capture(&self, capture: Box<dyn VariableCapture>) {
        self.variables.lock().register(capture);
    }

    /// Store `value` under the well-known variable `key` for the current stop.
    pub fn capture_variable(&self, key: &str, value: Value) -> bool {
        self.variables.lock().capture(key, value)
    }

    pub fn variables(&self) -> BTreeMap<String, Value> {
        self.variables.lock().export()
    }

    /// Evaluate a method entry against this session's breakpoints.
    ///
    /// `None` means the worker continues. On a stop the snapshot becomes the current context,
    /// the variable captures are refreshed from it, and the returned [`PendingStop`] keeps
    /// other workers of this session from stopping until it is dropped.
    pub fn process_method_entry(
        &self,
        snapshot: impl Into<Arc<ExecutionContext>>,
    ) -> Option<PendingStop<'_, C>> {
        if self.is_closed() {
            return None;
        }
        let snapshot = snapshot.into();

        // Workers that will not stop must not queue behind a parked one.
        decide(&snapshot, &self.breakpoints)?;

        let guard = self.stop_lock.lock();
        if self.is_closed() {
            return None;
        }
        // Breakpoints may have changed while waiting for the lock.
        let result = decide(&snapshot, &self.breakpoints)?;

        *self.stop_owner.lock() = Some(thread::current().id());
        *self.current_context.write() = Some(Arc::clone(&snapshot));
        self.variables.lock().refresh(&snapshot);

        tracing::debug!(
            parent: &self.span,
            resource = snapshot.resource(),
            line = snapshot.location(),
            "breakpoint hit"
        );

        Some(PendingStop {
            session: self,
            result,
            context: snapshot,
            _stop: guard,
        })
    }

    /// Park the calling thread for the configured suspend timeout.
    pub fn suspend(&self) -> SuspendOutcome {
        self.suspend_for(self.config.suspend_timeout())
    }

    /// Park the calling thread until the client resumes it, `timeout` elapses or the session
    /// closes.
    ///
    /// The thread holding this session's [`PendingStop`] parks directly. Any other thread
    /// first waits for the current stop to end, and that wait counts against `timeout`.
    pub fn suspend_for(&self, timeout: Duration) -> SuspendOutcome {
        let timeout = timeout.min(MAX_SUSPEND_TIMEOUT);
        if *self.stop_owner.lock() == Some(thread::current().id()) {
            return self.park(timeout);
        }

        let start = Instant::now();
        let Some(_stop) = self.stop_lock.try_lock_for(timeout) else {
            if self.is_closed() {
                return SuspendOutcome::Resumed;
            }
            self.log_timeout(timeout);
            return SuspendOutcome::TimedOut;
        };
        self.park(timeout.saturating_sub(start.elapsed()))
    }

    /// Let the parked worker (or the next one to park) continue.
    pub fn resume(&self) {
        tracing::debug!(parent: &self.span, "resume requested");
        self.gate.resume();
    }

    pub fn is_suspended(&self) -> bool {
        self.gate.parked() > 0
    }

    /// Tear the session down.
    ///
    /// A worker parked at a breakpoint is released as if resumed, and all breakpoint,
    /// context and variable state is dropped. Calling this more than once is harmless.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let released = self.gate.release();
        if released > 0 {
            tracing::warn!(
                parent: &self.span,
                connection = %self.connection_id(),
                timeout_ms = millis(self.config.suspend_timeout()),
                released,
                "connection closed while a thread was suspended at a breakpoint; resuming it"
            );
        }

        self.breakpoints.clear();
        *self.current_context.write() = None;
        self.variables.lock().clear();

        tracing::info!(
            parent: &self.span,
            connection = %self.connection_id(),
            "debug session closed"
        );
    }

    fn park(&self, timeout: Duration) -> SuspendOutcome {
        let outcome = self.gate.suspend(timeout);
        if outcome == SuspendOutcome::TimedOut {
            self.log_timeout(timeout);
        }
        outcome
    }

    fn log_timeout(&self, timeout: Duration) {
        tracing::warn!(
            parent: &self.span,
            connection = %self.connection_id(),
            timeout_ms = millis(timeout),
            "no instruction received from the remote debug client; resuming thread \
             suspended at breakpoint"
        );
    }

    fn stopped_event(&self, result: &ProcessingResult, context: &ExecutionContext) -> StoppedEvent {
        StoppedEvent {
            reason: "breakpoint".to_string(),
            tenant: self.tenant.clone(),
            resource: context.resource().to_string(),
            line: context.location(),
            method: context.method().map(str::to_string),
            breakpoints: result
                .matched_breakpoint()
                .map(|set| set.locations().to_vec())
                .unwrap_or_default(),
            variables: self.variables(),
            locals: context.locals().clone(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl<C: DebugChannel> Drop for DebugSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: DebugChannel> std::fmt::Debug for DebugSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSession")
            .field("connection", &self.connection_id())
            .field("tenant", &self.tenant)
            .field("breakpoints", &self.breakpoints.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A worker that hit a breakpoint and has not been released yet.
///
/// Dereferences to the [`ProcessingResult`] that caused the stop.
#[must_use = "dropping a PendingStop continues execution without suspending"]
pub struct PendingStop<'a, C: DebugChannel> {
    session: &'a DebugSession<C>,
    result: ProcessingResult,
    context: Arc<ExecutionContext>,
    _stop: MutexGuard<'a, ()>,
}

impl<'a, C: DebugChannel> PendingStop<'a, C> {
    pub fn result(&self) -> &ProcessingResult {
        &self.result
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }

    /// The "stopped" event for this stop, including the variables captured so far.
    pub fn event(&self) -> StoppedEvent {
        self.session.stopped_event(&self.result, &self.context)
    }

    /// Push [`event`](Self::event) to the client.
    ///
    /// Returns `false` if no channel is bound or the send failed; both are logged.
    pub fn notify(&self) -> bool {
        let Some(channel) = self.session.channel() else {
            tracing::warn!(
                parent: &self.session.span,
                "breakpoint hit but no channel is bound to the debug session"
            );
            return false;
        };

        match channel.send_stopped(&self.event()) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    parent: &self.session.span,
                    connection = %channel.id(),
                    error = %err,
                    "failed to send stopped event"
                );
                false
            }
        }
    }

    /// Park the worker for the session's configured suspend timeout.
    pub fn suspend(self) -> SuspendOutcome {
        let timeout = self.session.config.suspend_timeout();
        self.suspend_for(timeout)
    }

    pub fn suspend_for(self, timeout: Duration) -> SuspendOutcome {
        self.session.park(timeout)
    }

    /// Notify the client, then park until it resumes or the timeout elapses.
    pub fn halt(self) -> SuspendOutcome {
        self.notify();
        self.suspend()
    }
}

impl<C: DebugChannel> Drop for PendingStop<'_, C> {
    fn drop(&mut self) {
        *self.session.stop_owner.lock() = None;
    }
}

impl<C: DebugChannel> Deref for PendingStop<'_, C> {
    type Target = ProcessingResult;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}
