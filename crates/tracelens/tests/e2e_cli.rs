use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracelens_core::model::trace::TraceSearchResult;

const TRACE_A: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90";
const TRACE_B: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_tracelens")
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .env("TRACELENS_CONFIG", dir.join("absent.toml"))
        .env("RUST_LOG", "off")
        .env_remove("TRACELENS_PER_PAGE")
        .env_remove("TRACELENS_TRACE_LIST_MODE")
        .env_remove("TRACELENS_COALESCE_SLICES")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "tracelens failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn write(dir: &Path, name: &str, value: &impl serde::Serialize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
    path
}

fn traces_file(dir: &Path) -> PathBuf {
    let result = TraceSearchResult {
        data: vec![
            testkit::sample_trace(TRACE_A, 0),
            testkit::rootless_trace(TRACE_B, 5_000),
        ],
    };
    write(dir, "traces.json", &result)
}

#[test]
fn traces_render_breakdown_and_missing_root() {
    let temp = tempfile::tempdir().unwrap();
    let file = traces_file(temp.path());

    let out = stdout(&run(temp.path(), &["traces", file.to_str().unwrap()]));
    assert!(out.contains("\"Missing Trace Root\""), "{out}");
    assert!(out.contains("\"GET /v1/orders\""), "{out}");
    assert!(out.contains("spans=3/14"), "{out}");
    assert!(out.contains("api (sentry.python) 1.80s | Missing instrumentation 200ms"), "{out}");
    assert!(out.contains("-- page 1 (2 of 2 traces) --"), "{out}");

    let newest = out.find("0f1e2d3c").unwrap();
    let oldest = out.find("a1b2c3d4").unwrap();
    assert!(newest < oldest);
}

#[test]
fn traces_json_paginates_and_keeps_server_order() {
    let temp = tempfile::tempdir().unwrap();
    let file = traces_file(temp.path());
    let file = file.to_str().unwrap();

    let out = stdout(&run(temp.path(), &["--json", "traces", file, "--per-page", "1"]));
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["state"], "loaded");
    assert_eq!(v["hasNext"], true);
    assert_eq!(v["traces"][0]["trace"], TRACE_B);

    let out = stdout(&run(
        temp.path(),
        &["traces", file, "--json", "--mode", "server", "--no-coalesce"],
    ));
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["traces"][0]["trace"], TRACE_A);
    let slices = v["traces"][0]["breakdowns"].as_array().unwrap();
    assert_eq!(slices.len(), 40);
    assert_eq!(slices[39]["kind"], "missing");
    assert_eq!(slices[0]["sliceWidth"], 1);
}

#[test]
fn empty_and_failed_queries_are_not_errors() {
    let temp = tempfile::tempdir().unwrap();
    let empty = write(temp.path(), "empty.json", &serde_json::json!({ "data": [] }));
    let out = stdout(&run(temp.path(), &["traces", empty.to_str().unwrap()]));
    assert_eq!(out.trim(), "no results");

    let failed = write(
        temp.path(),
        "failed.json",
        &serde_json::json!({ "detail": "Invalid query. Bad field: span.opp" }),
    );
    let output = run(temp.path(), &["traces", failed.to_str().unwrap()]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: Invalid query. Bad field: span.opp"), "{stderr}");

    let out = stdout(&run(temp.path(), &["--json", "traces", failed.to_str().unwrap()]));
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["state"], "failed");
}

#[test]
fn spans_cap_at_ten_and_report_more() {
    let temp = tempfile::tempdir().unwrap();
    let file = write(temp.path(), "spans.json", &testkit::span_rows(TRACE_A, 12, Some(25)));
    let file = file.to_str().unwrap();

    let out = stdout(&run(
        temp.path(),
        &["spans", file, "--trace", TRACE_A, "--field", "user.email"],
    ));
    assert_eq!(out.matches("user.email=user").count(), 10, "{out}");
    assert!(out.contains("15 more spans"), "{out}");

    let out = stdout(&run(
        temp.path(),
        &[
            "--json",
            "spans",
            file,
            "--trace",
            TRACE_A,
            "--where",
            "project=api",
            "--highlight",
            "0000000000000001",
        ],
    ));
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["spans"].as_array().unwrap().len(), 10);
    assert_eq!(v["moreSpans"], 15);
    assert_eq!(v["matchingFilters"], 6);
    assert_eq!(v["highlight"], r#"["web","db"]"#);
}

#[test]
fn chart_splits_trailing_buckets() {
    let temp = tempfile::tempdir().unwrap();
    let last = testkit::base_ms();
    let file = write(temp.path(), "series.json", &testkit::sample_timeseries(last, 8));
    let now = (last + 30_000).to_string();

    let out = stdout(&run(
        temp.path(),
        &[
            "--json",
            "chart",
            file.to_str().unwrap(),
            "--y-axis",
            "count()",
            "--y-axis",
            "p95(span.duration)",
            "--display",
            "area",
            "--now",
            &now,
        ],
    ));
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    let ids: Vec<_> = v["series"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        ids,
        [
            "count()",
            "count()-ingestion",
            "p95(span.duration)",
            "p95(span.duration)-ingestion"
        ]
    );
    assert_eq!(v["ingestion_buckets"], 2);
    assert_eq!(v["series"][1]["style"]["stack"], "fogOfWar");
}

#[test]
fn tooltip_lists_each_series_once() {
    let temp = tempfile::tempdir().unwrap();
    let last = testkit::base_ms();
    let file = write(temp.path(), "series.json", &testkit::sample_timeseries(last, 8));
    let now = (last + 30_000).to_string();
    let at = last.to_string();

    let out = stdout(&run(
        temp.path(),
        &[
            "tooltip",
            file.to_str().unwrap(),
            "--at",
            &at,
            "--y-axis",
            "count()",
            "--y-axis",
            "p95(span.duration)",
            "--now",
            &now,
        ],
    ));
    assert_eq!(
        out.lines().collect::<Vec<_>>(),
        [
            "Feb 1, 2026 12:00 AM",
            "count(): 75",
            "p95(span.duration): 107ms"
        ]
    );
}

#[test]
fn config_file_sets_page_size() {
    let temp = tempfile::tempdir().unwrap();
    let file = traces_file(temp.path());
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "per_page = 1\ntrace_list_mode = \"server\"\n").unwrap();

    let out = stdout(&run(
        temp.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "--json",
            "traces",
            file.to_str().unwrap(),
        ],
    ));
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["perPage"], 1);
    assert_eq!(v["traces"][0]["trace"], TRACE_A);
}
