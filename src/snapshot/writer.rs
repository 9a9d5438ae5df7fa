//! Field-at-a-time JSON emission.
//!
//! The snapshot is consumed by value. Each top-level field is streamed into
//! the output, the output is flushed, and the field's buffer is dropped before
//! the next field is touched, so peak memory is the remaining in-memory fields
//! rather than the document plus its serialized text.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::error::Result;
use crate::snapshot::HeapSnapshot;

const WRITE_BUFFER_BYTES: usize = 1 << 20;

/// Totals reported once the snapshot has been written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    /// Bytes emitted to the destination.
    pub bytes_written: u64,
}

/// Writes `snapshot` to `path`, creating or truncating the file.
///
/// A failure part-way leaves a truncated file behind.
pub fn write_to_path(snapshot: HeapSnapshot, path: impl AsRef<Path>) -> Result<WriteSummary> {
    let path = path.as_ref();
    let started = Instant::now();
    let file = File::create(path)?;
    let summary = write_snapshot(snapshot, BufWriter::with_capacity(WRITE_BUFFER_BYTES, file))?;
    info!(
        path = %path.display(),
        bytes_written = summary.bytes_written,
        duration_ms = started.elapsed().as_secs_f64() * 1_000.0,
        "snapshot.write.complete"
    );
    Ok(summary)
}

/// Streams `snapshot` into `out` as a single JSON object.
///
/// Key order is `snapshot`, `nodes`, `edges`, `strings`, then the remaining
/// keys in their original order. Tombstoned edge slots are skipped.
pub fn write_snapshot<W: Write>(snapshot: HeapSnapshot, out: W) -> Result<WriteSummary> {
    let HeapSnapshot {
        snapshot: header,
        nodes,
        edges,
        strings,
        rest,
    } = snapshot;
    let mut out = CountingWriter::new(out);

    out.write_all(b"{")?;
    write_field(&mut out, "snapshot", &header, true)?;
    drop(header);
    write_field(&mut out, "nodes", &nodes, false)?;
    drop(nodes);
    write_field(&mut out, "edges", &LiveEdges(&edges), false)?;
    drop(edges);
    write_field(&mut out, "strings", &strings, false)?;
    drop(strings);
    for (key, value) in rest {
        write_field(&mut out, &key, &value, false)?;
    }
    out.write_all(b"}")?;
    out.flush()?;

    Ok(WriteSummary {
        bytes_written: out.written,
    })
}

fn write_field<W, T>(out: &mut CountingWriter<W>, key: &str, value: &T, first: bool) -> Result<()>
where
    W: Write,
    T: Serialize + ?Sized,
{
    let before = out.written;
    if !first {
        out.write_all(b",")?;
    }
    serde_json::to_writer(&mut *out, key).map_err(io::Error::from)?;
    out.write_all(b":")?;
    serde_json::to_writer(&mut *out, value).map_err(io::Error::from)?;
    out.flush()?;
    debug!(key, bytes = out.written - before, "snapshot.write.field");
    Ok(())
}

/// Serializes only the occupied edge slots.
struct LiveEdges<'a>(&'a [Option<u64>]);

impl Serialize for LiveEdges<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().flatten())
    }
}

struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
