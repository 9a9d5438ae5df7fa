//! Weak-retainer edge removal.
//!
//! Cleaning is a mark-and-compact pass: the walker visits every node in
//! order, edges owned by weak retainers are tombstoned in place, and only
//! after the last node has been visited are the tombstones swept out.

/// Constructor-name lookup and the weak retainer set.
pub mod classify;
/// Tombstoning of retainer edge runs and the compaction sweep.
pub mod prune;

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::snapshot::{GraphWalker, HeapSnapshot};

pub use classify::{constructor_index, RetainerIndex, RetainerSet, DEFAULT_WEAK_RETAINERS};
pub use prune::{compact_edges, prune_run};

/// Options controlling a clean pass.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Constructor names whose outgoing edges are removed.
    pub retainers: RetainerSet,
}

/// Per-constructor totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetainerTally {
    /// Nodes with this constructor name.
    pub nodes: u64,
    /// Edges removed from those nodes.
    pub edges_removed: u64,
}

/// Outcome of a clean pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Complete node records visited.
    pub nodes_scanned: u64,
    /// Nodes whose type decoded to `object`.
    pub object_nodes: u64,
    /// Nodes whose constructor name is in the retainer set.
    pub retainers_found: u64,
    /// Retainers that still owned edges and were pruned.
    pub retainers_pruned: u64,
    /// Edge records removed.
    pub edges_removed: u64,
    /// Declared edge count before cleaning.
    pub edge_count_before: u64,
    /// Declared edge count after cleaning.
    pub edge_count_after: u64,
    /// Totals keyed by constructor name.
    pub by_constructor: BTreeMap<String, RetainerTally>,
    /// Removed edges keyed by decoded edge type.
    pub removed_edge_types: BTreeMap<String, u64>,
}

impl CleanReport {
    /// True when at least one edge was removed and the snapshot needs
    /// rewriting.
    ///
    /// A retainer that already owns no edges does not count, so cleaning a
    /// cleaned snapshot reports no change.
    pub fn changed(&self) -> bool {
        self.edges_removed > 0
    }
}

/// Removes the outgoing edges of every weak-retainer node in `snapshot`.
///
/// A snapshot whose `meta` cannot be walked is left untouched and reported
/// as unchanged. An edge run that overruns the edges array fails the pass;
/// the snapshot may be partially marked in that case and must be discarded.
pub fn clean(snapshot: &mut HeapSnapshot, options: &CleanOptions) -> Result<CleanReport> {
    let started = Instant::now();
    let schema = snapshot.schema();
    let mut report = CleanReport {
        edge_count_before: snapshot.snapshot.edge_count,
        ..CleanReport::default()
    };

    if !schema.can_walk() {
        debug!("snapshot.clean.schema_incomplete");
        report.edge_count_after = snapshot.snapshot.edge_count;
        return Ok(report);
    }

    let retainers = RetainerIndex::build(&options.retainers, &snapshot.strings);
    debug!(strings = retainers.len(), "snapshot.clean.retainer_strings");

    let mut walker = GraphWalker::new(&schema);
    while let Some(run) = walker.next_run(&snapshot.nodes, snapshot.edges.len())? {
        report.nodes_scanned += 1;
        let Some(name_idx) = constructor_index(&schema, &snapshot.nodes, run.base) else {
            continue;
        };
        report.object_nodes += 1;
        let Some(name) = retainers.name(name_idx) else {
            continue;
        };

        let name = name.to_string();
        let removed = prune_run(snapshot, &schema, &run, &mut report.removed_edge_types);
        debug!(
            node = run.ordinal,
            constructor = %name,
            edges_removed = removed,
            "snapshot.clean.retainer"
        );
        report.retainers_found += 1;
        if removed > 0 {
            report.retainers_pruned += 1;
            report.edges_removed += removed;
        }
        let tally = report.by_constructor.entry(name).or_default();
        tally.nodes += 1;
        tally.edges_removed += removed;
    }

    let slots_removed = compact_edges(&mut snapshot.edges);
    report.edge_count_after = snapshot.snapshot.edge_count;
    info!(
        nodes_scanned = report.nodes_scanned,
        retainers_found = report.retainers_found,
        retainers_pruned = report.retainers_pruned,
        edges_removed = report.edges_removed,
        slots_removed,
        edge_count_after = report.edge_count_after,
        duration_ms = started.elapsed().as_secs_f64() * 1_000.0,
        "snapshot.clean.complete"
    );
    Ok(report)
}
