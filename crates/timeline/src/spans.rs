use tracelens_core::Result;
use tracelens_core::config::MAX_SPANS_PER_TRACE;
use tracelens_core::filter::{SpanFilter, matches_all};
use tracelens_core::model::span::{FieldValue, SpanResult, SpanSearchResult};
use tracelens_core::model::trace::{BreakdownSpan, TraceBreakdownSlice};
use tracing::debug;

use crate::breakdown::{BreakdownOptions, build_breakdown};

/// The spans shown under one expanded trace row.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanPage {
    pub trace_id: String,
    pub spans: Vec<SpanResult>,
    pub total_matching: usize,
    /// Rows of this trace passing the `--where` filters, counted before the cap.
    pub matching: usize,
}

impl SpanPage {
    pub fn new(
        trace_id: &str,
        mut spans: Vec<SpanResult>,
        total_matching: usize,
        cap: usize,
        matching: usize,
    ) -> Self {
        let total_matching = total_matching.max(spans.len());
        spans.truncate(cap);
        Self {
            trace_id: trace_id.to_string(),
            spans,
            total_matching,
            matching,
        }
    }

    /// Builds the page from a span search, dropping rows that belong to
    /// another trace so every span has exactly one owner.
    pub fn from_search(
        result: SpanSearchResult,
        trace_id: &str,
        cap: Option<usize>,
        filters: &[SpanFilter],
    ) -> Result<Self> {
        let mut spans = Vec::with_capacity(result.data.len());
        let mut foreign = 0usize;
        for row in result.data {
            let span = SpanResult::from_row(row)?;
            let owner = span.fields.get("trace").and_then(FieldValue::as_str);
            if owner.is_some_and(|owner| !owner.eq_ignore_ascii_case(trace_id)) {
                foreign += 1;
                continue;
            }
            spans.push(span);
        }
        if foreign > 0 {
            debug!(trace = trace_id, foreign, "ignored spans owned by other traces");
        }

        let total = result.meta.total.unwrap_or(spans.len());
        let matching = count_matching(&spans, filters);
        Ok(Self::new(
            trace_id,
            spans,
            total,
            cap.unwrap_or(MAX_SPANS_PER_TRACE),
            matching,
        ))
    }

    /// Matching spans the page does not show.
    pub fn more_spans(&self) -> Option<usize> {
        let hidden = self.total_matching.saturating_sub(self.spans.len());
        (hidden > 0).then_some(hidden)
    }

    pub fn more_label(&self) -> Option<String> {
        self.more_spans().map(|n| match n {
            1 => "1 more span".to_string(),
            n => format!("{n} more spans"),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Breakdown of just the listed spans over the trace window.
    pub fn breakdown(&self, start: f64, end: f64, opts: BreakdownOptions) -> Vec<TraceBreakdownSlice> {
        let intervals: Vec<BreakdownSpan> = self.spans.iter().map(BreakdownSpan::from).collect();
        build_breakdown(start, end, &intervals, opts)
    }
}

pub fn count_matching(spans: &[SpanResult], filters: &[SpanFilter]) -> usize {
    spans.iter().filter(|s| matches_all(filters, s)).count()
}
