use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::value::RawValue;

use crate::snapshot::decode_string;
use crate::snapshot::schema::{Schema, NAME_FIELD, TYPE_FIELD};

/// Node type whose `name` field holds a constructor name.
pub const OBJECT_NODE_TYPE: &str = "object";

/// Constructor names treated as weak retainers unless overridden.
pub const DEFAULT_WEAK_RETAINERS: [&str; 5] = [
    "WeakMap",
    "WeakSet",
    "WeakRef",
    "DebugWeakCache",
    "DebugWeakMap",
];

/// Closed set of constructor names whose outgoing edges are weak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainerSet {
    names: FxHashSet<String>,
}

impl RetainerSet {
    /// Builds a set from explicit names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds more names to the set.
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
    }

    /// Membership test.
    pub fn contains(&self, constructor: &str) -> bool {
        self.names.contains(constructor)
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of names in the set.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when the set matches nothing.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for RetainerSet {
    fn default() -> Self {
        Self::new(DEFAULT_WEAK_RETAINERS)
    }
}

/// String-table entries whose decoded text is in a [`RetainerSet`].
///
/// Built once per pass so classifying a node is a single map lookup on its
/// `name` field rather than a decode of the string it points at.
#[derive(Debug, Clone, Default)]
pub struct RetainerIndex {
    by_string: FxHashMap<u64, String>,
}

impl RetainerIndex {
    /// Scans `strings` for entries naming a retainer. Entries that do not
    /// decode are never retainers.
    pub fn build(retainers: &RetainerSet, strings: &[Box<RawValue>]) -> Self {
        let by_string = strings
            .iter()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let text = decode_string(raw)?;
                retainers
                    .contains(&text)
                    .then(|| (idx as u64, text.into_owned()))
            })
            .collect();
        Self { by_string }
    }

    /// Constructor name for string index `name`, if it is a retainer.
    pub fn name(&self, name: u64) -> Option<&str> {
        self.by_string.get(&name).map(String::as_str)
    }

    /// Number of string-table entries naming a retainer.
    pub fn len(&self) -> usize {
        self.by_string.len()
    }

    /// True when no string-table entry names a retainer.
    pub fn is_empty(&self) -> bool {
        self.by_string.is_empty()
    }
}

/// Returns the string-table index of the constructor name of the node whose
/// record starts at `base`.
///
/// Only `object` nodes have one; any other type, or a field the schema does
/// not declare, yields `None`.
pub fn constructor_index(schema: &Schema, nodes: &[u64], base: usize) -> Option<u64> {
    let type_offset = schema.node.get(TYPE_FIELD)?;
    let node_type = schema.node_types.name(*nodes.get(base + type_offset)?)?;
    if node_type != OBJECT_NODE_TYPE {
        return None;
    }
    nodes.get(base + schema.node.get(NAME_FIELD)?).copied()
}
