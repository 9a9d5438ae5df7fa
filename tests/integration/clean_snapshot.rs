#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use snapclean::clean::{clean, CleanOptions, RetainerSet};
use snapclean::cli::{run_clean, CleanConfig, CleanPhase, CliError};
use snapclean::snapshot::{write_to_path, HeapSnapshot};
use snapclean::SnapshotError;
use tempfile::TempDir;

/// Three nodes: a WeakMap owning two edges, a Foo owning one, and a native
/// node with none.
fn scenario() -> Value {
    json!({
        "snapshot": {
            "meta": {
                "node_fields": ["type", "name", "edge_count"],
                "node_types": [["hidden", "native", "object"], "string", "number"],
                "edge_fields": ["type", "name_or_index", "to_node"],
                "edge_types": [["context", "property", "weak"], "string_or_number", "node"],
                "location_fields": ["object_index", "script_id", "line", "column"]
            },
            "node_count": 3,
            "edge_count": 3,
            "trace_function_count": 0
        },
        "nodes": [2, 0, 2, 2, 1, 1, 1, 2, 0],
        "edges": [2, 3, 3, 1, 4, 6, 1, 3, 0],
        "strings": ["WeakMap", "Foo", "(native)", "key", "value"],
        "trace_function_infos": [],
        "trace_tree": [],
        "samples": [],
        "locations": []
    })
}

fn write_doc(dir: &Path, name: &str, doc: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(doc).expect("encode")).expect("write snapshot");
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).expect("read output")).expect("valid json")
}

#[test]
fn weak_map_edges_are_removed() {
    let mut snapshot =
        HeapSnapshot::from_slice(&serde_json::to_vec(&scenario()).expect("encode")).expect("parse");

    let report = clean(&mut snapshot, &CleanOptions::default()).expect("clean");

    assert!(report.changed());
    assert_eq!(report.edges_removed, 2);
    assert_eq!(snapshot.nodes, vec![2, 0, 0, 2, 1, 1, 1, 2, 0]);
    assert_eq!(snapshot.edges, vec![Some(1), Some(3), Some(0)]);
    assert_eq!(snapshot.snapshot.edge_count, 1);
}

#[test]
fn cleaned_file_keeps_structure() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_doc(dir.path(), "app.heapsnapshot", &scenario());

    let summary = run_clean(&CleanConfig::new(&input), |_| {}).expect("clean");

    let expected_output = dir.path().join("app.cleaned.heapsnapshot");
    assert_eq!(summary.output, expected_output);
    let written = summary.written.expect("output written");
    assert_eq!(
        written.bytes_written,
        fs::metadata(&expected_output).expect("output exists").len()
    );

    let original = scenario();
    let cleaned = read_json(&expected_output);
    let original_keys: Vec<&String> = original.as_object().expect("object").keys().collect();
    let cleaned_keys: Vec<&String> = cleaned.as_object().expect("object").keys().collect();
    assert_eq!(original_keys, cleaned_keys);

    assert_eq!(cleaned["snapshot"]["edge_count"], json!(1));
    assert_eq!(cleaned["snapshot"]["node_count"], json!(3));
    assert_eq!(cleaned["snapshot"]["trace_function_count"], json!(0));
    assert_eq!(cleaned["snapshot"]["meta"], original["snapshot"]["meta"]);
    assert_eq!(cleaned["nodes"], json!([2, 0, 0, 2, 1, 1, 1, 2, 0]));
    assert_eq!(cleaned["edges"], json!([1, 3, 0]));
    assert_eq!(cleaned["strings"], original["strings"]);
    assert_eq!(cleaned["trace_tree"], json!([]));
}

#[test]
fn already_clean_input_writes_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let mut doc = scenario();
    doc["strings"][0] = json!("Map");
    let input = write_doc(dir.path(), "clean.heapsnapshot", &doc);
    let mut phases = Vec::new();

    let summary = run_clean(&CleanConfig::new(&input), |phase| phases.push(phase)).expect("clean");

    assert!(!summary.report.changed());
    assert!(summary.written.is_none());
    assert!(!summary.output.exists());
    assert_eq!(phases, vec![CleanPhase::Load, CleanPhase::Clean]);
}

#[test]
fn dry_run_reports_without_writing() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_doc(dir.path(), "app.heapsnapshot", &scenario());
    let mut cfg = CleanConfig::new(&input);
    cfg.dry_run = true;

    let summary = run_clean(&cfg, |_| {}).expect("clean");

    assert_eq!(summary.report.edges_removed, 2);
    assert!(summary.written.is_none());
    assert!(!summary.output.exists());
}

#[test]
fn cleaning_output_again_is_a_no_op() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_doc(dir.path(), "app.heapsnapshot", &scenario());
    let first = run_clean(&CleanConfig::new(&input), |_| {}).expect("first pass");

    let mut cfg = CleanConfig::new(&first.output);
    cfg.output = Some(dir.path().join("again.heapsnapshot"));
    let second = run_clean(&cfg, |_| {}).expect("second pass");

    assert!(!second.report.changed());
    assert_eq!(second.report.retainers_found, 1);
    assert!(second.written.is_none());
}

#[test]
fn explicit_output_and_custom_retainers() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_doc(dir.path(), "app.heapsnapshot", &scenario());
    let output = dir.path().join("out").join("custom.json");
    fs::create_dir_all(output.parent().expect("parent")).expect("mkdir");
    let mut cfg = CleanConfig::new(&input);
    cfg.output = Some(output.clone());
    cfg.options.retainers = RetainerSet::new(["Foo"]);

    let summary = run_clean(&cfg, |_| {}).expect("clean");

    assert_eq!(summary.report.edges_removed, 1);
    let cleaned = read_json(&output);
    assert_eq!(cleaned["nodes"], json!([2, 0, 2, 2, 1, 0, 1, 2, 0]));
    assert_eq!(cleaned["edges"], json!([2, 3, 3, 1, 4, 6]));
    assert_eq!(cleaned["snapshot"]["edge_count"], json!(2));
}

#[test]
fn overrunning_edge_counts_are_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let mut doc = scenario();
    doc["nodes"][5] = json!(7);
    let input = write_doc(dir.path(), "broken.heapsnapshot", &doc);

    let err = run_clean(&CleanConfig::new(&input), |_| {}).expect_err("overrun");

    assert!(matches!(
        err,
        CliError::Snapshot(SnapshotError::EdgeOverrun { node: 1, .. })
    ));
    assert!(!dir.path().join("broken.cleaned.heapsnapshot").exists());
}

#[test]
fn malformed_json_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("truncated.heapsnapshot");
    fs::write(&input, br#"{"snapshot": {"meta": {}, "node_count": 0"#).expect("write");

    let err = run_clean(&CleanConfig::new(&input), |_| {}).expect_err("malformed");

    assert!(matches!(err, CliError::Snapshot(SnapshotError::Json(_))));
}

#[test]
fn null_edge_slots_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let mut doc = scenario();
    doc["edges"][8] = Value::Null;
    let input = write_doc(dir.path(), "holey.heapsnapshot", &doc);

    let err = run_clean(&CleanConfig::new(&input), |_| {}).expect_err("null edge");

    assert!(matches!(err, CliError::Snapshot(SnapshotError::Json(_))));
    assert!(!dir.path().join("holey.cleaned.heapsnapshot").exists());
}

#[test]
fn unpaired_surrogates_survive_cleaning() {
    let dir = TempDir::new().expect("tempdir");
    let text = serde_json::to_string(&scenario())
        .expect("encode")
        .replace(r#""key""#, r#""\ud800 key""#);
    let input = dir.path().join("app.heapsnapshot");
    fs::write(&input, &text).expect("write snapshot");

    let summary = run_clean(&CleanConfig::new(&input), |_| {}).expect("clean");

    assert_eq!(summary.report.edges_removed, 2);
    let written = fs::read_to_string(&summary.output).expect("read output");
    assert!(written.contains(r#""\ud800 key""#), "output: {written}");
}

#[test]
fn write_to_path_overwrites_existing_file() {
    let dir = TempDir::new().expect("tempdir");
    let target = dir.path().join("existing.heapsnapshot");
    fs::write(&target, "stale contents that are longer than nothing").expect("seed");
    let mut snapshot =
        HeapSnapshot::from_slice(&serde_json::to_vec(&scenario()).expect("encode")).expect("parse");
    clean(&mut snapshot, &CleanOptions::default()).expect("clean");

    write_to_path(snapshot, &target).expect("write");

    let reread = HeapSnapshot::open(&target).expect("reopen");
    assert_eq!(reread.snapshot.edge_count, reread.edge_count_sum());
    assert_eq!(reread.edges.len(), 3);
}
