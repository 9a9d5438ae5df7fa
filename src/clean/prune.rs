use std::collections::BTreeMap;

use crate::snapshot::schema::{Schema, EDGE_COUNT_FIELD, TYPE_FIELD};
use crate::snapshot::{HeapSnapshot, NodeRun};

/// Label used when an edge's type cannot be decoded.
pub const UNKNOWN_EDGE_TYPE: &str = "<unknown>";

/// Removes every edge owned by `run`'s node.
///
/// The run's slots are tombstoned in place, the node's own `edge_count` is
/// set to zero and the header's declared `edge_count` drops by the same
/// amount. Runs keep their original width until [`compact_edges`] runs, so
/// the walker's cursor arithmetic stays valid. Removed edges are tallied by
/// decoded edge type into `removed_types`. Returns the number of edge records
/// removed.
pub fn prune_run(
    snapshot: &mut HeapSnapshot,
    schema: &Schema,
    run: &NodeRun,
    removed_types: &mut BTreeMap<String, u64>,
) -> u64 {
    let stride = schema.edge.stride();
    if stride == 0 || run.edge_count == 0 {
        return 0;
    }

    if let Some(type_offset) = schema.edge.get(TYPE_FIELD) {
        for record in run.edges.clone().step_by(stride) {
            let label = snapshot.edges[record + type_offset]
                .and_then(|raw| schema.edge_types.name(raw))
                .unwrap_or(UNKNOWN_EDGE_TYPE);
            *removed_types.entry(label.to_string()).or_default() += 1;
        }
    }

    snapshot.edges[run.edges.clone()].fill(None);
    if let Some(offset) = schema.node.get(EDGE_COUNT_FIELD) {
        snapshot.nodes[run.base + offset] = 0;
    }
    snapshot.snapshot.edge_count = snapshot.snapshot.edge_count.saturating_sub(run.edge_count);
    run.edge_count
}

/// Drops tombstoned slots, keeping survivors in their original order.
/// Returns the number of slots removed.
pub fn compact_edges(edges: &mut Vec<Option<u64>>) -> usize {
    let before = edges.len();
    edges.retain(Option::is_some);
    before - edges.len()
}
