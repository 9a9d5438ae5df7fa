#![forbid(unsafe_code)]

//! Library side of the `snapclean` command.
//!
//! Argument parsing and console output live in the binary; this module holds
//! the load → clean → write sequence so it can be driven and tested without a
//! terminal.

/// Cleaning a snapshot file into a sibling output file.
pub mod clean;

pub use clean::{
    default_output_path, run_clean, CleanConfig, CleanPhase, CleanSummary, CliError,
    DEFAULT_OUTPUT_SUFFIX,
};
