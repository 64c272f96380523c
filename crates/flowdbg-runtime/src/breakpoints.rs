use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::Line;

/// Breakpoint locations registered for one resource.
///
/// Locations are kept sorted and de-duplicated so lookups are deterministic regardless of the
/// order the client sent them in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreakpointSet {
    resource: String,
    locations: Vec<Line>,
}

impl BreakpointSet {
    pub fn new(resource: impl Into<String>, locations: impl IntoIterator<Item = Line>) -> Self {
        let mut locations: Vec<Line> = locations.into_iter().collect();
        locations.sort_unstable();
        locations.dedup();
        Self {
            resource: resource.into(),
            locations,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn locations(&self) -> &[Line] {
        &self.locations
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, line: Line) -> bool {
        self.locations.binary_search(&line).is_ok()
    }
}

/// Per-resource breakpoint sets owned by a single debug session.
///
/// Each write swaps the whole `Arc<BreakpointSet>` for a resource, so a reader holding a set
/// never observes a partially applied update.
#[derive(Debug, Default)]
pub struct BreakpointRegistry {
    by_resource: RwLock<HashMap<String, Arc<BreakpointSet>>>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the breakpoints of `resource`.
    ///
    /// An empty `locations` list keeps the resource registered with no breakpoints, which is
    /// different from a resource that was never registered.
    pub fn set_breakpoints(
        &self,
        resource: &str,
        locations: impl IntoIterator<Item = Line>,
    ) -> Arc<BreakpointSet> {
        let set = Arc::new(BreakpointSet::new(resource, locations));
        self.by_resource
            .write()
            .insert(resource.to_string(), Arc::clone(&set));
        set
    }

    pub fn get_breakpoints(&self, resource: &str) -> Option<Arc<BreakpointSet>> {
        self.by_resource.read().get(resource).cloned()
    }

    /// Snapshot of every registered set, ordered by resource name.
    ///
    /// Legacy diagnostic API kept for tooling that dumps the whole registry. Stop decisions
    /// never go through it; see [`crate::decision::decide`].
    pub fn list_all(&self) -> Vec<Arc<BreakpointSet>> {
        let mut sets: Vec<_> = self.by_resource.read().values().cloned().collect();
        sets.sort_by(|a, b| a.resource().cmp(b.resource()));
        sets
    }

    pub fn is_empty(&self) -> bool {
        self.by_resource.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_resource.read().len()
    }

    pub(crate) fn clear(&self) {
        self.by_resource.write().clear();
    }
}
