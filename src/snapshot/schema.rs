//! Field layout of node and edge records, read from the snapshot's `meta`.

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

/// Name of the node field holding the number of edges a node owns.
pub const EDGE_COUNT_FIELD: &str = "edge_count";
/// Name of the field whose value indexes into a type table.
pub const TYPE_FIELD: &str = "type";
/// Name of the node field holding a string-table index.
pub const NAME_FIELD: &str = "name";

/// Maps field names to their position inside a fixed-width record.
#[derive(Debug, Clone, Default)]
pub struct FieldOffsets {
    by_name: FxHashMap<String, usize>,
    stride: usize,
}

impl FieldOffsets {
    /// Builds offsets from an ordered list of field names.
    ///
    /// Entries that are not strings still occupy a slot in the record but
    /// cannot be looked up by name.
    pub fn from_fields(fields: &[Value]) -> Self {
        let by_name = fields
            .iter()
            .enumerate()
            .filter_map(|(offset, field)| field.as_str().map(|name| (name.to_string(), offset)))
            .collect();
        Self {
            by_name,
            stride: fields.len(),
        }
    }

    /// Returns the offset of `name`, if the record declares it.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Number of integers in one record.
    pub fn stride(&self) -> usize {
        self.stride
    }
}

/// Enumerated type names referenced by a record's `type` field.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    names: Vec<String>,
}

impl TypeTable {
    fn from_value(value: Option<&Value>) -> Self {
        let names = value
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| entry.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();
        Self { names }
    }

    /// Decodes a raw `type` value.
    pub fn name(&self, raw: u64) -> Option<&str> {
        let idx = usize::try_from(raw).ok()?;
        self.names.get(idx).map(String::as_str)
    }

    /// Returns true when no type names were declared.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolved record layout for one snapshot.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Node field offsets.
    pub node: FieldOffsets,
    /// Edge field offsets.
    pub edge: FieldOffsets,
    /// Names for the node `type` field.
    pub node_types: TypeTable,
    /// Names for the edge `type` field.
    pub edge_types: TypeTable,
}

impl Schema {
    /// Resolves offsets and type tables from the `meta` object.
    ///
    /// Missing or oddly shaped entries resolve to empty tables rather than
    /// errors; lookups against them simply return `None`.
    pub fn resolve(meta: &Map<String, Value>) -> Self {
        let node = field_offsets(meta, "node_fields");
        let edge = field_offsets(meta, "edge_fields");
        let node_types = type_table(meta, "node_types", &node);
        let edge_types = type_table(meta, "edge_types", &edge);
        Self {
            node,
            edge,
            node_types,
            edge_types,
        }
    }

    /// True when the node and edge arrays can be walked: both strides are
    /// non-zero and nodes declare an `edge_count` field.
    pub fn can_walk(&self) -> bool {
        self.node.stride() > 0
            && self.edge.stride() > 0
            && self.node.get(EDGE_COUNT_FIELD).is_some()
    }
}

fn field_offsets(meta: &Map<String, Value>, key: &str) -> FieldOffsets {
    meta.get(key)
        .and_then(Value::as_array)
        .map(|fields| FieldOffsets::from_fields(fields))
        .unwrap_or_default()
}

// `<kind>_types` is parallel to `<kind>_fields`; the entry at the `type`
// field's own offset is the list of type names.
fn type_table(meta: &Map<String, Value>, key: &str, offsets: &FieldOffsets) -> TypeTable {
    let entry = offsets.get(TYPE_FIELD).and_then(|offset| {
        meta.get(key)
            .and_then(Value::as_array)
            .and_then(|types| types.get(offset))
    });
    TypeTable::from_value(entry)
}
