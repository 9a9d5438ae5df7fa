//! Sequential traversal of node records and their edge runs.
//!
//! Edge runs carry no index of their own: a node's run starts where the
//! previous node's run ended, so the only way to reach node `i`'s edges is to
//! walk nodes `0..i` in order, accumulating their edge counts.

use std::ops::Range;

use crate::error::{Result, SnapshotError};
use crate::snapshot::schema::{Schema, EDGE_COUNT_FIELD};

/// One node record together with the edge slots it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRun {
    /// Position of the node in node order.
    pub ordinal: usize,
    /// Index of the node's first field in the nodes array.
    pub base: usize,
    /// Value of the node's `edge_count` field.
    pub edge_count: u64,
    /// Slots of the edges array owned by this node.
    pub edges: Range<usize>,
}

/// Forward-only cursor over node records.
///
/// The walker does not hold a borrow of the arrays between calls, so callers
/// may rewrite the node they were just handed before asking for the next one.
#[derive(Debug, Clone)]
pub struct GraphWalker {
    node_stride: usize,
    edge_stride: usize,
    edge_count_offset: Option<usize>,
    next_base: usize,
    ordinal: usize,
    cursor: usize,
}

impl GraphWalker {
    /// Creates a walker positioned before the first node.
    pub fn new(schema: &Schema) -> Self {
        Self {
            node_stride: schema.node.stride(),
            edge_stride: schema.edge.stride(),
            edge_count_offset: schema.node.get(EDGE_COUNT_FIELD),
            next_base: 0,
            ordinal: 0,
            cursor: 0,
        }
    }

    /// Returns the next node and its edge run, or `None` once every complete
    /// node record has been visited.
    ///
    /// The edge cursor advances past the run whether or not the caller goes
    /// on to prune it; the cursor tracks the original physical layout.
    pub fn next_run(&mut self, nodes: &[u64], edges_len: usize) -> Result<Option<NodeRun>> {
        let Some(count_offset) = self.edge_count_offset else {
            return Ok(None);
        };
        if self.node_stride == 0 || self.next_base + self.node_stride > nodes.len() {
            return Ok(None);
        }

        let base = self.next_base;
        let edge_count = nodes[base + count_offset];
        let start = self.cursor;
        let end = usize::try_from(edge_count)
            .ok()
            .and_then(|count| count.checked_mul(self.edge_stride))
            .and_then(|width| start.checked_add(width))
            .filter(|end| *end <= edges_len)
            .ok_or_else(|| SnapshotError::EdgeOverrun {
                node: self.ordinal,
                start,
                end: start.saturating_add((edge_count as usize).saturating_mul(self.edge_stride)),
                len: edges_len,
            })?;

        let run = NodeRun {
            ordinal: self.ordinal,
            base,
            edge_count,
            edges: start..end,
        };
        self.cursor = end;
        self.next_base += self.node_stride;
        self.ordinal += 1;
        Ok(Some(run))
    }

    /// Edge slots consumed so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
