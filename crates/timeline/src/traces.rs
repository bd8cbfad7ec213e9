use tracelens_core::QueryFailure;
use tracelens_core::config::TraceListMode;
use tracelens_core::model::trace::{RawTrace, TraceResult};
use tracing::{debug, warn};

use crate::breakdown::{BreakdownOptions, build_breakdown, normalize_slices};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    pub mode: TraceListMode,
    pub breakdown: BreakdownOptions,
}

/// Turns a trace search result into table rows.
///
/// Both modes share one slice rule: a precomputed breakdown is normalized,
/// otherwise one is built from the trace's span intervals. They differ only in
/// ordering, where client mode sorts newest first and server mode keeps the
/// order it was given.
pub fn normalize_traces(raw: Vec<RawTrace>, opts: &IngestOptions) -> Vec<TraceResult> {
    let mut traces: Vec<TraceResult> = raw
        .into_iter()
        .map(|t| normalize_trace(t, &opts.breakdown))
        .collect();

    if opts.mode == TraceListMode::ClientNormalized {
        traces.sort_by(|a, b| b.start.cmp(&a.start));
    }
    traces
}

pub fn normalize_trace(raw: RawTrace, opts: &BreakdownOptions) -> TraceResult {
    let mut end = raw.end;
    if end < raw.start {
        warn!(trace = %raw.trace, start = raw.start, end, "trace ends before it starts, clamping");
        end = raw.start;
    }

    let mut matching_spans = raw.matching_spans;
    if matching_spans > raw.num_spans {
        warn!(
            trace = %raw.trace,
            matching_spans,
            num_spans = raw.num_spans,
            "more matching spans than spans, clamping"
        );
        matching_spans = raw.num_spans;
    }

    let (start_ms, end_ms) = (raw.start as f64, end as f64);
    let breakdowns = match raw.breakdowns {
        Some(slices) if !slices.is_empty() => normalize_slices(start_ms, end_ms, slices, *opts),
        _ => {
            debug!(trace = %raw.trace, spans = raw.spans.len(), "computing breakdown from spans");
            build_breakdown(start_ms, end_ms, &raw.spans, *opts)
        }
    };

    TraceResult {
        trace: raw.trace,
        name: raw.name,
        project: raw.project,
        start: raw.start,
        end,
        duration: end - raw.start,
        num_spans: raw.num_spans,
        matching_spans,
        num_errors: raw.num_errors,
        num_occurrences: raw.num_occurrences,
        breakdowns,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TracePage {
    pub items: Vec<TraceResult>,
    /// 1-based.
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub has_next: bool,
}

pub fn paginate(traces: Vec<TraceResult>, page: usize, per_page: usize) -> TracePage {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = traces.len();
    let offset = (page - 1).saturating_mul(per_page);

    let items: Vec<TraceResult> = traces.into_iter().skip(offset).take(per_page).collect();
    let has_next = offset.saturating_add(items.len()) < total;

    TracePage {
        items,
        page,
        per_page,
        total,
        has_next,
    }
}

/// What the trace table shows: rows, the "no results" state, or a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceListState {
    Empty,
    Failed(QueryFailure),
    Loaded(TracePage),
}

impl TraceListState {
    pub fn from_result(
        result: std::result::Result<Vec<TraceResult>, QueryFailure>,
        page: usize,
        per_page: usize,
    ) -> Self {
        match result {
            Err(failure) => Self::Failed(failure),
            Ok(traces) if traces.is_empty() => Self::Empty,
            Ok(traces) => {
                let page = paginate(traces, page, per_page);
                if page.items.is_empty() {
                    Self::Empty
                } else {
                    Self::Loaded(page)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tracelens_core::model::trace::{BreakdownSpan, MISSING_TRACE_ROOT, SliceKey, TraceBreakdownSlice};

    use super::*;

    fn raw(trace: &str, start: i64, end: i64) -> RawTrace {
        RawTrace {
            trace: trace.to_string(),
            name: Some("GET /".to_string()),
            project: Some("api".to_string()),
            start,
            end,
            num_spans: 4,
            matching_spans: 2,
            num_errors: 0,
            num_occurrences: 0,
            breakdowns: None,
            spans: Vec::new(),
        }
    }

    #[test]
    fn client_mode_sorts_newest_first_server_mode_keeps_order() {
        let input = vec![raw("old", 0, 10), raw("new", 100, 110), raw("mid", 50, 60)];

        let client = normalize_traces(input.clone(), &IngestOptions::default());
        let order: Vec<_> = client.iter().map(|t| t.trace.as_str()).collect();
        assert_eq!(order, ["new", "mid", "old"]);

        let server = normalize_traces(
            input,
            &IngestOptions {
                mode: TraceListMode::ServerSorted,
                ..IngestOptions::default()
            },
        );
        let order: Vec<_> = server.iter().map(|t| t.trace.as_str()).collect();
        assert_eq!(order, ["old", "new", "mid"]);
    }

    #[test]
    fn clamps_invariant_violations() {
        let mut t = raw("bad", 100, 50);
        t.matching_spans = 9;
        let out = normalize_trace(t, &BreakdownOptions::default());
        assert_eq!(out.end, 100);
        assert_eq!(out.duration, 0);
        assert_eq!(out.matching_spans, 4);
        assert_eq!(out.breakdowns.len(), 1);
    }

    #[test]
    fn both_modes_yield_the_same_slices() {
        let mut computed = raw("t", 0, 100_000);
        computed.spans = vec![BreakdownSpan {
            project: Some("a".to_string()),
            op_category: None,
            sdk_name: None,
            start: 20_000.0,
            end: 80_000.0,
        }];
        let mut precomputed = raw("t", 0, 100_000);
        precomputed.breakdowns = Some(vec![TraceBreakdownSlice::project(
            Some("a".to_string()),
            None,
            None,
            (8, 32),
            20_000.0,
            80_000.0,
        )]);

        let client = normalize_traces(vec![computed], &IngestOptions::default());
        let server = normalize_traces(
            vec![precomputed],
            &IngestOptions {
                mode: TraceListMode::ServerSorted,
                ..IngestOptions::default()
            },
        );
        assert_eq!(client[0].breakdowns, server[0].breakdowns);
        assert_eq!(client[0].breakdowns[1].key(), Some(SliceKey::new(Some("a"), None)));
    }

    #[test]
    fn paginate_reports_next_page() {
        let traces: Vec<_> = (0..5)
            .map(|i| normalize_trace(raw(&i.to_string(), i, i + 1), &BreakdownOptions::default()))
            .collect();

        let first = paginate(traces.clone(), 1, 2);
        assert_eq!(first.items.len(), 2);
        assert!(first.has_next);
        assert_eq!(first.total, 5);

        let last = paginate(traces.clone(), 3, 2);
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_next);

        let zero = paginate(traces, 0, 0);
        assert_eq!(zero.page, 1);
        assert_eq!(zero.per_page, 1);
    }

    #[test]
    fn list_state_distinguishes_empty_from_failure() {
        assert_eq!(TraceListState::from_result(Ok(Vec::new()), 1, 20), TraceListState::Empty);

        let failure = QueryFailure::from_response(Some(400), r#"{"detail":"bad query"}"#);
        assert_eq!(
            TraceListState::from_result(Err(failure.clone()), 1, 20),
            TraceListState::Failed(failure)
        );

        let one = vec![normalize_trace(raw("t", 0, 1), &BreakdownOptions::default())];
        assert!(matches!(
            TraceListState::from_result(Ok(one.clone()), 1, 20),
            TraceListState::Loaded(_)
        ));
        assert_eq!(TraceListState::from_result(Ok(one), 4, 20), TraceListState::Empty);
    }

    #[test]
    fn sample_traces_render_breakdown_and_missing_root() {
        let traces = normalize_traces(
            vec![testkit::sample_trace("a1", 0), testkit::rootless_trace("b2", 5_000)],
            &IngestOptions::default(),
        );

        assert_eq!(traces[0].trace, "b2");
        assert_eq!(traces[0].root_label(), MISSING_TRACE_ROOT);
        assert_eq!(traces[0].breakdowns.len(), 1);
        assert!(traces[0].breakdowns[0].is_missing());

        let slices = &traces[1].breakdowns;
        assert_eq!(traces[1].root_label(), "GET /v1/orders");
        assert_eq!(slices.iter().map(|s| s.slice_width()).sum::<usize>(), 40);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].key(), Some(SliceKey::new(Some("api"), Some("sentry.python"))));
        assert_eq!(slices[0].slice_end(), 36);
        assert!(slices[1].is_missing());
    }
}
