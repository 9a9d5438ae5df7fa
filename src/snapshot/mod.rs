//! In-memory heap snapshot and its flat node/edge layout.
//!
//! A snapshot is read whole into memory, cleaned in place, and then handed by
//! value to [`writer::write_snapshot`], which releases it field by field.

pub mod schema;
pub mod walker;
pub mod writer;

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;

use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{Result, SnapshotError};
use schema::{Schema, EDGE_COUNT_FIELD};

pub use schema::{FieldOffsets, TypeTable};
pub use walker::{GraphWalker, NodeRun};
pub use writer::{write_snapshot, write_to_path, WriteSummary};

const READ_BUFFER_BYTES: usize = 1 << 20;

/// The `snapshot` header object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Field layouts and type tables; kept verbatim so key order round-trips.
    pub meta: Map<String, Value>,
    /// Declared number of nodes.
    pub node_count: u64,
    /// Declared number of edges. Maintained by the pruner as edges are removed.
    pub edge_count: u64,
    /// Remaining header keys in input order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A parsed heap snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct HeapSnapshot {
    /// Header with metadata and declared counts.
    pub snapshot: SnapshotHeader,
    /// Fixed-stride node records.
    pub nodes: Vec<u64>,
    /// Edge runs in node order. `None` marks a tombstoned slot awaiting
    /// compaction; the input itself may only hold unsigned integers.
    #[serde(deserialize_with = "edge_slots")]
    pub edges: Vec<Option<u64>>,
    /// String table referenced by `name` fields, kept as the literal JSON
    /// text of each entry. V8 emits lone surrogate escapes here, which are
    /// not valid `String`s but must survive a rewrite unchanged.
    pub strings: Vec<Box<RawValue>>,
    /// Every other top-level key, in input order.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl HeapSnapshot {
    /// Reads a snapshot from a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SnapshotError::input_not_found(path));
        }
        let started = Instant::now();
        let file = File::open(path)?;
        let snapshot = Self::from_reader(BufReader::with_capacity(READ_BUFFER_BYTES, file))?;
        info!(
            path = %path.display(),
            nodes = snapshot.snapshot.node_count,
            edges = snapshot.snapshot.edge_count,
            strings = snapshot.strings.len(),
            duration_ms = started.elapsed().as_secs_f64() * 1_000.0,
            "snapshot.load.complete"
        );
        Ok(snapshot)
    }

    /// Parses a snapshot from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Parses a snapshot from an in-memory document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Resolves the record layout declared by this snapshot's `meta`.
    pub fn schema(&self) -> Schema {
        Schema::resolve(&self.snapshot.meta)
    }

    /// Decoded text of string-table entry `index`.
    pub fn string(&self, index: usize) -> Option<Cow<'_, str>> {
        self.strings.get(index).and_then(|raw| decode_string(raw))
    }

    /// Sum of every node's own `edge_count` field, saturating at `u64::MAX`.
    pub fn edge_count_sum(&self) -> u64 {
        let schema = self.schema();
        let (Some(offset), stride) = (schema.node.get(EDGE_COUNT_FIELD), schema.node.stride())
        else {
            return 0;
        };
        if stride == 0 {
            return 0;
        }
        self.nodes
            .chunks_exact(stride)
            .fold(0u64, |sum, record| sum.saturating_add(record[offset]))
    }

    /// Number of edge slots that are not tombstoned.
    pub fn live_edge_slots(&self) -> usize {
        self.edges.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Decodes one string-table entry, or `None` when its escapes do not form
/// valid UTF-16 (a lone surrogate, for instance).
pub fn decode_string(raw: &RawValue) -> Option<Cow<'_, str>> {
    let text = raw.get();
    if let Ok(plain) = serde_json::from_str::<&str>(text) {
        return Some(Cow::Borrowed(plain));
    }
    serde_json::from_str::<String>(text).ok().map(Cow::Owned)
}

fn edge_slots<'de, D>(deserializer: D) -> std::result::Result<Vec<Option<u64>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EdgeSlots;

    impl<'de> Visitor<'de> for EdgeSlots {
        type Value = Vec<Option<u64>>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an array of unsigned integers")
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut slots = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(value) = seq.next_element::<u64>()? {
                slots.push(Some(value));
            }
            Ok(slots)
        }
    }

    deserializer.deserialize_seq(EdgeSlots)
}
