use chrono::{Duration, TimeZone, Utc};
use tracelens_core::model::series::{Series, SeriesKind, SeriesPoint, SeriesStyle};
use tracelens_core::model::span::{SpanSearchMeta, SpanSearchResult};
use tracelens_core::model::trace::{BreakdownSpan, RawTrace};
use tracelens_core::query::TimeseriesResponse;

pub const MINUTE_MS: i64 = 60_000;

pub fn base_ms() -> i64 {
    Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0)
        .unwrap()
        .timestamp_millis()
}

pub fn span(project: &str, op: Option<&str>, start: i64, end: i64) -> BreakdownSpan {
    BreakdownSpan {
        project: Some(project.to_string()),
        op_category: op.map(str::to_string),
        sdk_name: Some("sentry.python".to_string()),
        start: start as f64,
        end: end as f64,
    }
}

/// A 2s trace: `api` root, a `db` span inside it, and 200ms at the end
/// nothing was instrumented for.
pub fn sample_trace(trace_id: &str, offset_ms: i64) -> RawTrace {
    let start = base_ms() + offset_ms;
    RawTrace {
        trace: trace_id.to_string(),
        name: Some("GET /v1/orders".to_string()),
        project: Some("api".to_string()),
        start,
        end: start + 2_000,
        num_spans: 14,
        matching_spans: 3,
        num_errors: 1,
        num_occurrences: 0,
        breakdowns: None,
        spans: vec![
            span("api", None, start, start + 1_800),
            span("api", Some("db"), start + 900, start + 1_600),
        ],
    }
}

pub fn rootless_trace(trace_id: &str, offset_ms: i64) -> RawTrace {
    RawTrace {
        name: None,
        spans: Vec::new(),
        ..sample_trace(trace_id, offset_ms)
    }
}

/// Span search rows for `trace_id`, `n` of them, one second apart.
pub fn span_rows(trace_id: &str, n: usize, total: Option<usize>) -> SpanSearchResult {
    let start = base_ms() as f64 / 1_000.0;
    let data = (0..n)
        .filter_map(|i| {
            serde_json::json!({
                "id": format!("{i:016x}"),
                "trace": trace_id,
                "project": if i % 2 == 0 { "api" } else { "web" },
                "transaction.id": format!("{:032x}", i + 1),
                "precise.start_ts": start + i as f64,
                "precise.finish_ts": start + i as f64 + 0.25,
                "span.duration": 250.0,
                "span.description": format!("SELECT * FROM orders WHERE id = {i}"),
                "span.category": "db",
                "sdk.name": "sentry.python",
                "user.email": format!("user{i}@example.com")
            })
            .as_object()
            .cloned()
        })
        .collect();
    SpanSearchResult {
        data,
        meta: SpanSearchMeta { total },
    }
}

/// `count()` and `p95(span.duration)` over `buckets` minutes ending at
/// `last_bucket_ms`. Every fourth `count()` bucket is empty.
pub fn sample_timeseries(last_bucket_ms: i64, buckets: usize) -> TimeseriesResponse {
    let first_s = (last_bucket_ms - MINUTE_MS * (buckets as i64 - 1)) / 1_000;
    let count: Vec<_> = (0..buckets)
        .map(|i| {
            let v = if i % 4 == 2 { serde_json::Value::Null } else { serde_json::json!(i * 10 + 5) };
            serde_json::json!([first_s + 60 * i as i64, [{ "count": v }]])
        })
        .collect();
    let p95: Vec<_> = (0..buckets)
        .map(|i| serde_json::json!([first_s + 60 * i as i64, [{ "count": 100.0 + i as f64 }]]))
        .collect();
    serde_json::from_value(serde_json::json!({
        "count()": { "data": count, "meta": { "units": { "count()": null } } },
        "p95(span.duration)": { "data": p95, "meta": { "units": { "p95(span.duration)": "millisecond" } } }
    }))
    .unwrap()
}

pub fn series(name: &str, values: &[Option<f64>], last_bucket_ms: i64) -> Series {
    let first = last_bucket_ms - MINUTE_MS * (values.len() as i64 - 1);
    Series {
        id: name.to_string(),
        name: name.to_string(),
        color: "#444674".to_string(),
        unit: "none".to_string(),
        operation: "count".to_string(),
        kind: SeriesKind::Line,
        style: SeriesStyle::default(),
        points: values
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint::new(first + Duration::minutes(i as i64).num_milliseconds(), *v))
            .collect(),
    }
}
