//! Binary entry point for the `snapclean` command.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;
use snapclean::clean::{CleanReport, RetainerSet};
use snapclean::cli::{run_clean, CleanConfig, CleanPhase, CleanSummary, DEFAULT_OUTPUT_SUFFIX};
use snapclean::SnapshotError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::CliConfig;
use ui::{format_bytes, format_duration, ColorChoice, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "snapclean",
    version,
    about = "Remove weak-retainer edges from V8 heap snapshots"
)]
struct Cli {
    #[arg(value_name = "INPUT", help = "Heap snapshot to clean")]
    input: PathBuf,

    #[arg(
        value_name = "OUTPUT",
        help = "Destination (defaults to INPUT with a suffix before the extension)"
    )]
    output: Option<PathBuf>,

    #[arg(
        long = "retainer",
        value_name = "NAME",
        action = ArgAction::Append,
        help = "Additional constructor name to treat as a weak retainer (repeatable)"
    )]
    retainers: Vec<String>,

    #[arg(
        long = "only-retainer",
        value_name = "NAME",
        action = ArgAction::Append,
        help = "Replace the weak retainer set with these names (repeatable)"
    )]
    only_retainers: Vec<String>,

    #[arg(
        long,
        value_name = "SUFFIX",
        help = "Suffix for the default output path [default: cleaned]"
    )]
    suffix: Option<String>,

    #[arg(long, help = "Report what would be removed without writing anything")]
    dry_run: bool,

    #[arg(
        long,
        env = "SNAPCLEAN_CONFIG",
        value_name = "FILE",
        help = "Path to a TOML config file"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for the report"
    )]
    format: OutputFormat,

    #[arg(long, value_enum, value_name = "WHEN", help = "Style output [default: auto]")]
    color: Option<ColorChoice>,

    #[arg(short, long, help = "Only print warnings and errors")]
    quiet: bool,

    #[arg(short, long, help = "Log each retainer and write phase to stderr")]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    input: String,
    output: String,
    written: bool,
    dry_run: bool,
    bytes_written: Option<u64>,
    duration_ms: f64,
    #[serde(flatten)]
    report: &'a CleanReport,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "snapclean=debug"
    } else {
        "snapclean=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = CliConfig::load(cli.config.clone())?;
    debug!(config = ?config.path(), "cli.config.loaded");

    let json = cli.format == OutputFormat::Json;
    let color = cli.color.or(config.color()).unwrap_or_default();
    let ui = Ui::new(color, cli.quiet || json);
    let cfg = build_clean_config(&cli, &config);
    let output = cfg.output_path();

    if !cfg.input.is_file() {
        return Err(SnapshotError::InputNotFound(cfg.input.clone()).into());
    }
    let mut spinner = ui.spinner(phase_label(CleanPhase::Load));
    let summary = run_clean(&cfg, |phase| {
        if phase == CleanPhase::Write && output.exists() {
            spinner.warn(&format!("{} already exists and will be overwritten", output.display()));
        }
        spinner.phase(phase_label(phase));
    })?;
    let elapsed = spinner.finish();

    if json {
        emit_json(&cfg, &summary, elapsed)?;
    } else {
        print_summary(&ui, &cfg, &summary, elapsed);
    }
    Ok(())
}

fn build_clean_config(cli: &Cli, config: &CliConfig) -> CleanConfig {
    let mut retainers = if cli.only_retainers.is_empty() {
        config.retainers()
    } else {
        RetainerSet::new(cli.only_retainers.iter().cloned())
    };
    retainers.extend(cli.retainers.iter().cloned());

    let mut cfg = CleanConfig::new(&cli.input);
    cfg.output = cli.output.clone();
    cfg.suffix = cli
        .suffix
        .as_deref()
        .or(config.suffix())
        .unwrap_or(DEFAULT_OUTPUT_SUFFIX)
        .to_string();
    cfg.options.retainers = retainers;
    cfg.dry_run = cli.dry_run;
    cfg
}

fn phase_label(phase: CleanPhase) -> &'static str {
    match phase {
        CleanPhase::Load => "Reading snapshot",
        CleanPhase::Clean => "Removing weak retainer edges",
        CleanPhase::Write => "Writing cleaned snapshot",
    }
}

fn emit_json(
    cfg: &CleanConfig,
    summary: &CleanSummary,
    elapsed: Duration,
) -> Result<(), Box<dyn Error>> {
    let report = JsonReport {
        input: cfg.input.display().to_string(),
        output: summary.output.display().to_string(),
        written: summary.written.is_some(),
        dry_run: cfg.dry_run,
        bytes_written: summary.written.map(|w| w.bytes_written),
        duration_ms: elapsed.as_secs_f64() * 1_000.0,
        report: &summary.report,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_summary(ui: &Ui, cfg: &CleanConfig, summary: &CleanSummary, elapsed: Duration) {
    let report = &summary.report;
    let took = format_duration(elapsed);

    if !report.changed() {
        ui.ok(&format!(
            "{} holds no weak retainer edges; nothing written ({took})",
            display_name(&cfg.input)
        ));
        return;
    }
    match summary.written {
        Some(written) => ui.ok(&format!(
            "wrote {} ({}) in {took}",
            summary.output.display(),
            format_bytes(written.bytes_written)
        )),
        None => ui.note(&format!(
            "dry run: {} edges would be removed; {} not written ({took})",
            report.edges_removed,
            summary.output.display()
        )),
    }

    ui.table(
        "Summary",
        &[
            ("nodes scanned", report.nodes_scanned.to_string()),
            ("object nodes", report.object_nodes.to_string()),
            (
                "weak retainers",
                format!(
                    "{} ({} pruned)",
                    report.retainers_found, report.retainers_pruned
                ),
            ),
            ("edges removed", report.edges_removed.to_string()),
            (
                "edge count",
                format!("{} → {}", report.edge_count_before, report.edge_count_after),
            ),
        ],
    );
    let retainers: Vec<(&str, String)> = report
        .by_constructor
        .iter()
        .map(|(name, tally)| {
            (
                name.as_str(),
                format!("{} nodes, {} edges", tally.nodes, tally.edges_removed),
            )
        })
        .collect();
    ui.table("By constructor", &retainers);
    let edge_types: Vec<(&str, String)> = report
        .removed_edge_types
        .iter()
        .map(|(ty, count)| (ty.as_str(), count.to_string()))
        .collect();
    ui.table("Removed edge types", &edge_types);
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
