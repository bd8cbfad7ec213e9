//! Quantizes a trace's spans onto a fixed number of timeline buckets.
//!
//! Every bucket goes to the span with the largest overlap (earliest start on
//! ties); buckets nobody covers become missing slices. Quantized bounds give a
//! uniform bar while each slice still reports the true timing of its spans.

use tracelens_core::config::BREAKDOWN_SLICES;
use tracelens_core::model::trace::{BreakdownSpan, TraceBreakdownSlice};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakdownOptions {
    pub slices: usize,
    /// Merge neighbouring buckets of the same identity into one slice.
    pub coalesce: bool,
}

impl Default for BreakdownOptions {
    fn default() -> Self {
        Self {
            slices: BREAKDOWN_SLICES,
            coalesce: true,
        }
    }
}

pub fn build_breakdown(
    start: f64,
    end: f64,
    spans: &[BreakdownSpan],
    opts: BreakdownOptions,
) -> Vec<TraceBreakdownSlice> {
    let total = opts.slices.max(1);
    let end = end.max(start);

    if spans.is_empty() {
        return vec![TraceBreakdownSlice::missing(0, total, start, end)];
    }

    let mut ordered: Vec<&BreakdownSpan> = spans.iter().collect();
    ordered.sort_by(|a, b| a.start.total_cmp(&b.start));

    if end <= start {
        debug!(start, spans = spans.len(), "zero-width trace window");
        return vec![project_slice(ordered[0], 0, total)];
    }

    let mut out = Vec::with_capacity(if opts.coalesce { 4 } else { total });
    for bucket in 0..total {
        let (b0, b1) = bucket_bounds(start, end, total, bucket);
        let closed_right = bucket + 1 == total;

        let mut best: Option<(&BreakdownSpan, f64)> = None;
        for span in &ordered {
            let Some(amount) = overlap(span, b0, b1, closed_right) else {
                continue;
            };
            match best {
                Some((_, current)) if amount <= current => {}
                _ => best = Some((span, amount)),
            }
        }

        let slice = match best {
            Some((span, _)) => project_slice(span, bucket, bucket + 1),
            None => TraceBreakdownSlice::missing(bucket, bucket + 1, b0, b1),
        };
        out.push(slice);
    }

    if opts.coalesce { coalesce(out) } else { out }
}

/// Time bounds of one bucket. The last bucket ends exactly at `end`.
pub fn bucket_bounds(start: f64, end: f64, total: usize, bucket: usize) -> (f64, f64) {
    let width = (end - start) / total as f64;
    let b0 = start + width * bucket as f64;
    let b1 = if bucket + 1 >= total {
        end
    } else {
        start + width * (bucket + 1) as f64
    };
    (b0, b1)
}

fn overlap(span: &BreakdownSpan, b0: f64, b1: f64, closed_right: bool) -> Option<f64> {
    if span.end <= span.start {
        let inside = span.start >= b0 && (span.start < b1 || (closed_right && span.start <= b1));
        return inside.then_some(0.0);
    }
    if span.start < b1 && span.end > b0 {
        Some(span.end.min(b1) - span.start.max(b0))
    } else {
        None
    }
}

fn project_slice(span: &BreakdownSpan, slice_start: usize, slice_end: usize) -> TraceBreakdownSlice {
    TraceBreakdownSlice::project(
        span.project.clone(),
        span.op_category.clone(),
        span.sdk_name.clone(),
        (slice_start, slice_end),
        span.start,
        span.end.max(span.start),
    )
}

fn same_identity(a: &TraceBreakdownSlice, b: &TraceBreakdownSlice) -> bool {
    a.is_missing() == b.is_missing() && a.key() == b.key()
}

/// Merges adjacent slices of the same kind and identity.
pub fn coalesce(slices: Vec<TraceBreakdownSlice>) -> Vec<TraceBreakdownSlice> {
    let mut out: Vec<TraceBreakdownSlice> = Vec::with_capacity(slices.len());
    for slice in slices {
        if let Some(last) = out.last_mut()
            && last.slice_end() == slice.slice_start()
            && same_identity(last, &slice)
        {
            let merged = last
                .with_bounds(last.slice_start(), slice.slice_end())
                .with_timing(last.start().min(slice.start()), last.end().max(slice.end()));
            *last = merged;
            continue;
        }
        out.push(slice);
    }
    out
}

/// Brings a precomputed slice list into the same shape the builder emits:
/// ordered, clipped to `[0, total]`, gaps filled with missing slices,
/// overlaps trimmed, then coalesced or split per bucket.
pub fn normalize_slices(
    start: f64,
    end: f64,
    slices: Vec<TraceBreakdownSlice>,
    opts: BreakdownOptions,
) -> Vec<TraceBreakdownSlice> {
    let total = opts.slices.max(1);
    let end = end.max(start);

    let mut ordered = slices;
    ordered.sort_by_key(|s| s.slice_start());

    let mut out = Vec::with_capacity(ordered.len() + 2);
    let mut cursor = 0;
    for slice in ordered {
        let slice_start = slice.slice_start().max(cursor);
        let slice_end = slice.slice_end().min(total);
        if slice_end <= slice_start {
            debug!(
                slice_start = slice.slice_start(),
                slice_end = slice.slice_end(),
                "dropping empty or overlapped breakdown slice"
            );
            continue;
        }
        if slice_start > cursor {
            out.push(missing_span(start, end, total, cursor, slice_start));
        }
        out.push(slice.with_bounds(slice_start, slice_end));
        cursor = slice_end;
    }
    if cursor < total {
        out.push(missing_span(start, end, total, cursor, total));
    }

    if opts.coalesce {
        coalesce(out)
    } else {
        split_per_bucket(start, end, total, out)
    }
}

fn missing_span(start: f64, end: f64, total: usize, from: usize, to: usize) -> TraceBreakdownSlice {
    let (t0, _) = bucket_bounds(start, end, total, from);
    let (_, t1) = bucket_bounds(start, end, total, to - 1);
    TraceBreakdownSlice::missing(from, to, t0, t1)
}

fn split_per_bucket(
    start: f64,
    end: f64,
    total: usize,
    slices: Vec<TraceBreakdownSlice>,
) -> Vec<TraceBreakdownSlice> {
    let mut out = Vec::with_capacity(total);
    for slice in slices {
        for bucket in slice.slice_start()..slice.slice_end() {
            if slice.is_missing() {
                let (b0, b1) = bucket_bounds(start, end, total, bucket);
                out.push(TraceBreakdownSlice::missing(bucket, bucket + 1, b0, b1));
            } else {
                out.push(slice.with_bounds(bucket, bucket + 1));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use tracelens_core::model::trace::SliceKey;

    use super::*;

    fn span(project: &str, start: f64, end: f64) -> BreakdownSpan {
        BreakdownSpan {
            project: Some(project.to_string()),
            op_category: None,
            sdk_name: None,
            start,
            end,
        }
    }

    fn assert_contiguous(slices: &[TraceBreakdownSlice], total: usize) {
        let mut cursor = 0;
        for s in slices {
            assert_eq!(s.slice_start(), cursor);
            assert!(s.slice_end() > s.slice_start());
            cursor = s.slice_end();
        }
        assert_eq!(cursor, total);
        assert_eq!(slices.iter().map(|s| s.slice_width()).sum::<usize>(), total);
    }

    #[test]
    fn ten_slice_example() {
        let opts = BreakdownOptions {
            slices: 10,
            coalesce: true,
        };
        let slices = build_breakdown(0.0, 100_000.0, &[span("a", 20_000.0, 80_000.0)], opts);

        assert_eq!(slices.len(), 3);
        assert!(slices[0].is_missing());
        assert_eq!((slices[0].slice_start(), slices[0].slice_end()), (0, 2));
        assert_eq!(slices[0].start(), 0.0);
        assert_eq!(slices[0].end(), 20_000.0);
        assert_eq!(slices[1].key(), Some(SliceKey::new(Some("a"), None)));
        assert_eq!((slices[1].slice_start(), slices[1].slice_end()), (2, 8));
        assert_eq!(slices[1].duration(), 60_000.0);
        assert!(slices[2].is_missing());
        assert_eq!((slices[2].slice_start(), slices[2].slice_end()), (8, 10));
        assert_contiguous(&slices, 10);
    }

    #[test]
    fn per_bucket_mode_keeps_every_bucket() {
        let opts = BreakdownOptions {
            slices: 10,
            coalesce: false,
        };
        let slices = build_breakdown(0.0, 100_000.0, &[span("a", 20_000.0, 80_000.0)], opts);
        assert_eq!(slices.len(), 10);
        assert!(slices[1].is_missing());
        assert!(!slices[2].is_missing());
        assert!(!slices[7].is_missing());
        assert!(slices[8].is_missing());
        assert_contiguous(&slices, 10);
    }

    #[test]
    fn zero_spans_is_one_missing_slice() {
        for coalesce in [true, false] {
            let slices = build_breakdown(
                5.0,
                500.0,
                &[],
                BreakdownOptions {
                    slices: BREAKDOWN_SLICES,
                    coalesce,
                },
            );
            assert_eq!(slices.len(), 1);
            assert!(slices[0].is_missing());
            assert_eq!(slices[0].slice_width(), BREAKDOWN_SLICES);
            assert_eq!(slices[0].start(), 5.0);
            assert_eq!(slices[0].end(), 500.0);
        }
    }

    #[test]
    fn greatest_overlap_wins_bucket() {
        let opts = BreakdownOptions {
            slices: 2,
            coalesce: true,
        };
        // bucket 0 is [0, 50): "a" covers 10ms of it, "b" 40ms.
        let spans = [span("a", 0.0, 10.0), span("b", 10.0, 100.0)];
        let slices = build_breakdown(0.0, 100.0, &spans, opts);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].key(), Some(SliceKey::new(Some("b"), None)));
        assert_eq!(slices[0].slice_width(), 2);
    }

    #[test]
    fn ties_go_to_earliest_start_then_input_order() {
        let opts = BreakdownOptions {
            slices: 1,
            coalesce: true,
        };
        let spans = [span("late", 10.0, 100.0), span("early", 0.0, 90.0)];
        let slices = build_breakdown(0.0, 100.0, &spans, opts);
        assert_eq!(slices[0].key(), Some(SliceKey::new(Some("early"), None)));

        let spans = [span("first", 0.0, 100.0), span("second", 0.0, 100.0)];
        let slices = build_breakdown(0.0, 100.0, &spans, opts);
        assert_eq!(slices[0].key(), Some(SliceKey::new(Some("first"), None)));
    }

    #[test]
    fn secondary_identity_splits_slices() {
        let opts = BreakdownOptions {
            slices: 4,
            coalesce: true,
        };
        let mut db = span("api", 0.0, 50.0);
        db.op_category = Some("db".to_string());
        db.sdk_name = Some("sentry.python".to_string());
        let mut http = span("api", 50.0, 100.0);
        http.sdk_name = Some("sentry.python".to_string());

        let slices = build_breakdown(0.0, 100.0, &[db, http], opts);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].key(), Some(SliceKey::new(Some("api"), Some("db"))));
        assert_eq!(
            slices[1].key(),
            Some(SliceKey::new(Some("api"), Some("sentry.python")))
        );
    }

    #[test]
    fn coalesced_project_slice_reports_union_of_spans() {
        let opts = BreakdownOptions {
            slices: 4,
            coalesce: true,
        };
        let spans = [span("a", 0.0, 40.0), span("a", 45.0, 100.0)];
        let slices = build_breakdown(0.0, 100.0, &spans, opts);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].start(), 0.0);
        assert_eq!(slices[0].end(), 100.0);
        assert_eq!(slices[0].duration(), 100.0);
    }

    #[test]
    fn zero_length_span_claims_its_bucket() {
        let opts = BreakdownOptions {
            slices: 4,
            coalesce: false,
        };
        let slices = build_breakdown(0.0, 100.0, &[span("a", 30.0, 30.0), span("b", 100.0, 100.0)], opts);
        assert!(slices[0].is_missing());
        assert_eq!(slices[1].key(), Some(SliceKey::new(Some("a"), None)));
        assert!(slices[2].is_missing());
        assert_eq!(slices[3].key(), Some(SliceKey::new(Some("b"), None)));
    }

    #[test]
    fn degenerate_window_uses_earliest_span() {
        let slices = build_breakdown(
            50.0,
            50.0,
            &[span("b", 50.0, 50.0), span("a", 49.0, 50.0)],
            BreakdownOptions::default(),
        );
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].key(), Some(SliceKey::new(Some("a"), None)));
        assert_eq!(slices[0].slice_width(), BREAKDOWN_SLICES);
    }

    #[test]
    fn spans_outside_window_leave_it_missing() {
        let slices = build_breakdown(
            0.0,
            100.0,
            &[span("a", 200.0, 300.0)],
            BreakdownOptions::default(),
        );
        assert_eq!(slices.len(), 1);
        assert!(slices[0].is_missing());
    }

    #[test]
    fn contiguity_holds_for_irregular_input() {
        let spans = [
            span("a", 3.0, 17.0),
            span("b", 11.0, 12.5),
            span("c", 40.0, 41.0),
            span("a", 60.0, 99.0),
            span("d", 95.0, 140.0),
        ];
        for slices in [7, 13, 40] {
            for coalesce in [true, false] {
                let out = build_breakdown(0.0, 123.0, &spans, BreakdownOptions { slices, coalesce });
                assert_contiguous(&out, slices);
                for pair in out.windows(2) {
                    if coalesce {
                        assert!(!(pair[0].is_missing() == pair[1].is_missing() && pair[0].key() == pair[1].key()));
                    }
                }
            }
        }
    }

    #[test]
    fn normalize_fills_gaps_and_trims_overlaps() {
        let opts = BreakdownOptions {
            slices: 10,
            coalesce: true,
        };
        let precomputed = vec![
            TraceBreakdownSlice::project(Some("b".into()), None, None, (6, 12), 60.0, 100.0),
            TraceBreakdownSlice::project(Some("a".into()), None, None, (2, 7), 20.0, 70.0),
        ];
        let out = normalize_slices(0.0, 100.0, precomputed, opts);

        assert_eq!(out.len(), 3);
        assert!(out[0].is_missing());
        assert_eq!((out[0].slice_start(), out[0].slice_end()), (0, 2));
        assert_eq!(out[0].end(), 20.0);
        assert_eq!((out[1].slice_start(), out[1].slice_end()), (2, 7));
        assert_eq!((out[2].slice_start(), out[2].slice_end()), (7, 10));
        assert_eq!(out[2].key(), Some(SliceKey::new(Some("b"), None)));
        assert_contiguous(&out, 10);
    }

    #[test]
    fn normalize_matches_builder_in_both_modes() {
        let spans = [span("a", 20_000.0, 80_000.0)];
        for coalesce in [true, false] {
            let opts = BreakdownOptions {
                slices: 10,
                coalesce,
            };
            let built = build_breakdown(0.0, 100_000.0, &spans, opts);
            let server = vec![TraceBreakdownSlice::project(
                Some("a".into()),
                None,
                None,
                (2, 8),
                20_000.0,
                80_000.0,
            )];
            assert_eq!(normalize_slices(0.0, 100_000.0, server, opts), built);
        }
    }

    #[test]
    fn normalize_empty_list_is_all_missing() {
        let out = normalize_slices(0.0, 10.0, Vec::new(), BreakdownOptions::default());
        assert_eq!(out.len(), 1);
        assert!(out[0].is_missing());
        assert_eq!(out[0].slice_width(), BREAKDOWN_SLICES);
    }
}
