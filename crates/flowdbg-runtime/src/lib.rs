//! Breakpoint session coordinator for remotely debugged authentication flows.
//!
//! This crate provides:
//! - A per-connection [`DebugSession`] holding the client's breakpoints.
//! - The stop decision for an instrumented method entry ([`decision::decide`]).
//! - A [`SuspensionGate`] that parks the worker thread until the client resumes it, the
//!   suspend timeout elapses, or the connection closes.
//! - Variable capturers exposing authorization and token responses at a stop.
//!
//! Framing, protocol encoding and instrumentation live outside this crate; they meet it at
//! [`DebugChannel`] and [`MethodContext`].

pub mod breakpoints;
pub mod channel;
pub mod context;
pub mod decision;
pub mod error;
pub mod manager;
pub mod session;
pub mod suspend;
pub mod variables;

mod mock;

pub use crate::breakpoints::{BreakpointRegistry, BreakpointSet};
pub use crate::channel::DebugChannel;
pub use crate::context::{ExecutionContext, Line, MethodContext};
pub use crate::decision::{decide, InstructionType, ProcessingResult};
pub use crate::error::{DebugError, DebugResult};
pub use crate::manager::DebugSessionManager;
pub use crate::mock::MockChannel;
pub use crate::session::{DebugSession, PendingStop, StoppedEvent};
pub use crate::suspend::{SuspendOutcome, SuspensionGate, MAX_SUSPEND_TIMEOUT};
pub use crate::variables::{
    AuthzResponseVariable, TokenResponseVariable, VariableCapture, VariableCaptures,
    AUTHZ_RESPONSE_KEY, TOKEN_RESPONSE_KEY,
};
pub use flowdbg_config::DebugConfig;
