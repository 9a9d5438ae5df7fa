use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::clean::{clean, CleanOptions, CleanReport};
use crate::error::SnapshotError;
use crate::snapshot::{write_to_path, HeapSnapshot, WriteSummary};

/// Suffix inserted before the extension of the default output path.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "cleaned";

/// Configuration for one clean run.
#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// Snapshot to read.
    pub input: PathBuf,
    /// Destination; derived from `input` and `suffix` when `None`.
    pub output: Option<PathBuf>,
    /// Suffix used to derive the default destination.
    pub suffix: String,
    /// Retainer set and other clean options.
    pub options: CleanOptions,
    /// Clean in memory and report without writing anything.
    pub dry_run: bool,
}

impl CleanConfig {
    /// Config for `input` with default options.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            options: CleanOptions::default(),
            dry_run: false,
        }
    }

    /// The path the cleaned snapshot is written to.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input, &self.suffix))
    }
}

/// Phases reported to the caller as a run progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanPhase {
    /// Reading and parsing the input.
    Load,
    /// Marking and compacting weak edges.
    Clean,
    /// Writing the cleaned snapshot.
    Write,
}

/// Result of a clean run.
#[derive(Debug, Clone)]
pub struct CleanSummary {
    /// Destination the snapshot was (or would have been) written to.
    pub output: PathBuf,
    /// What the clean pass found and removed.
    pub report: CleanReport,
    /// Present only when an output file was written.
    pub written: Option<WriteSummary>,
}

/// Error type for the clean command.
#[derive(Error, Debug)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// Snapshot read, clean or write failure.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        CliError::Snapshot(SnapshotError::Io(value))
    }
}

/// Derives the default output path by inserting `suffix` before the input's
/// extension: `app.heapsnapshot` becomes `app.cleaned.heapsnapshot`, and an
/// input without an extension gets `.cleaned` appended.
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let Some(stem) = input.file_stem() else {
        return input.to_path_buf();
    };
    let mut name = OsString::from(stem);
    name.push(".");
    name.push(suffix);
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}

/// Loads, cleans and (when anything changed) rewrites a snapshot.
///
/// The input is checked before anything is read. When the snapshot holds no
/// weak edges, or `dry_run` is set, no output file is created. `on_phase` is
/// called as each phase begins.
pub fn run_clean(
    cfg: &CleanConfig,
    mut on_phase: impl FnMut(CleanPhase),
) -> Result<CleanSummary, CliError> {
    if !cfg.input.is_file() {
        return Err(SnapshotError::InputNotFound(cfg.input.clone()).into());
    }
    let output = cfg.output_path();
    if output.is_dir() {
        return Err(CliError::Message(format!(
            "output path {} is a directory",
            output.display()
        )));
    }

    on_phase(CleanPhase::Load);
    let mut snapshot = HeapSnapshot::open(&cfg.input)?;

    on_phase(CleanPhase::Clean);
    let report = clean(&mut snapshot, &cfg.options)?;

    if !report.changed() {
        info!(input = %cfg.input.display(), "cli.clean.skipped");
        return Ok(CleanSummary {
            output,
            report,
            written: None,
        });
    }
    if cfg.dry_run {
        info!(input = %cfg.input.display(), "cli.clean.dry_run");
        return Ok(CleanSummary {
            output,
            report,
            written: None,
        });
    }

    on_phase(CleanPhase::Write);
    let written = write_to_path(snapshot, &output)?;
    Ok(CleanSummary {
        output,
        report,
        written: Some(written),
    })
}
