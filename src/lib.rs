//! Removes weak-retainer edges from V8-style heap snapshots.
//!
//! Heap snapshots encode the object graph as two flat integer arrays whose
//! record layout is declared in the file's own `meta` header. Edges held by
//! `WeakMap`, `WeakSet`, `WeakRef` and friends do not keep their targets
//! alive, yet heap inspectors count them when computing retained sizes. This
//! crate drops those edges, fixes up the edge counts, and writes the snapshot
//! back out one top-level field at a time.
//!
//! ```no_run
//! use snapclean::clean::{clean, CleanOptions};
//! use snapclean::snapshot::{write_to_path, HeapSnapshot};
//!
//! let mut snapshot = HeapSnapshot::open("app.heapsnapshot")?;
//! let report = clean(&mut snapshot, &CleanOptions::default())?;
//! if report.changed() {
//!     write_to_path(snapshot, "app.cleaned.heapsnapshot")?;
//! }
//! # Ok::<(), snapclean::SnapshotError>(())
//! ```

#![warn(missing_docs)]

pub mod clean;
pub mod cli;
pub mod error;
pub mod snapshot;

pub use error::{Result, SnapshotError};
