use std::sync::Arc;

use serde::Serialize;

use crate::breakpoints::{BreakpointRegistry, BreakpointSet};
use crate::context::ExecutionContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InstructionType {
    Stop,
    Continue,
}

/// Outcome of evaluating one method entry against the breakpoint registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessingResult {
    instruction: InstructionType,
    matched_breakpoint: Option<Arc<BreakpointSet>>,
}

impl ProcessingResult {
    pub fn stop(matched: Arc<BreakpointSet>) -> Self {
        Self {
            instruction: InstructionType::Stop,
            matched_breakpoint: Some(matched),
        }
    }

    pub fn instruction(&self) -> InstructionType {
        self.instruction
    }

    /// The set that caused the stop. Always present for [`InstructionType::Stop`].
    pub fn matched_breakpoint(&self) -> Option<&Arc<BreakpointSet>> {
        self.matched_breakpoint.as_ref()
    }

    pub fn is_stop(&self) -> bool {
        self.instruction == InstructionType::Stop
    }
}

/// Decide whether execution must halt at `snapshot`.
///
/// Only the set registered under the snapshot's own resource is consulted, and only an exact
/// location hit stops. `None` means continue without notifying the client.
pub fn decide(
    snapshot: &ExecutionContext,
    registry: &BreakpointRegistry,
) -> Option<ProcessingResult> {
    if snapshot.resource().is_empty() {
        return None;
    }

    let set = registry.get_breakpoints(snapshot.resource())?;
    if set.is_empty() || !set.contains(snapshot.location()) {
        return None;
    }

    Some(ProcessingResult::stop(set))
}
