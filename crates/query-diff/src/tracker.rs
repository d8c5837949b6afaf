use fxhash::FxHashMap;

use crate::{NodeId, RecordId, query::Selection};

/// Remembers which parts of queries were requested for each record, so that they can be
/// refetched together later on.
#[derive(Debug, Default)]
pub struct QueryTracker {
    tracked: FxHashMap<RecordId, Vec<Selection>>,
}

impl QueryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `selection` as requested on the record. Tracking the same node twice is a no-op.
    pub fn track_node_for_id(&mut self, id: &RecordId, selection: &Selection) {
        let tracked = self.tracked.entry(id.clone()).or_default();
        if !tracked.iter().any(|node| node.id() == selection.id()) {
            tracked.push(selection.clone());
        }
    }

    pub fn tracked_nodes_for_id(&self, id: &RecordId) -> &[Selection] {
        self.tracked.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_tracked(&self, id: &RecordId, node: NodeId) -> bool {
        self.tracked_nodes_for_id(id).iter().any(|selection| selection.id() == node)
    }

    pub fn untrack_nodes_for_id(&mut self, id: &RecordId) {
        self.tracked.remove(id);
    }
}
