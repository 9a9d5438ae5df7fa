//! Error types for reading, cleaning and writing snapshots.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for snapshot operations.
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Errors raised while reading, cleaning or writing a heap snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The input path does not resolve to an existing file.
    #[error("snapshot not found: {}", .0.display())]
    InputNotFound(PathBuf),
    /// I/O error while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The document is not valid JSON or lacks a required top-level field.
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    /// A node's edge run reaches past the end of the edges array.
    #[error("node {node} owns edge slots {start}..{end} but the edges array has {len} entries")]
    EdgeOverrun {
        /// Ordinal of the offending node.
        node: usize,
        /// First edge slot of the run.
        start: usize,
        /// One past the last edge slot of the run.
        end: usize,
        /// Length of the edges array.
        len: usize,
    },
}

impl SnapshotError {
    pub(crate) fn input_not_found(path: impl AsRef<Path>) -> Self {
        SnapshotError::InputNotFound(path.as_ref().to_path_buf())
    }
}
