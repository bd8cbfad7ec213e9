use owo_colors::{AnsiColors, OwoColorize};
use serde_json::json;
use tracelens_chart::Chart;
use tracelens_chart::format::SeriesFormatter;
use tracelens_chart::tooltip::{Tooltip, format_timestamp};
use tracelens_core::ids::short_id;
use tracelens_core::model::series::{LineStyle, SeriesKind};
use tracelens_core::model::span::SpanResult;
use tracelens_core::model::trace::{SliceKey, TraceBreakdownSlice, TraceResult};
use tracelens_core::time::format_duration_ms;
use tracelens_timeline::{HighlightState, SpanPage, TraceListState};

const SLICE_COLORS: &[AnsiColors] = &[
    AnsiColors::Cyan,
    AnsiColors::Magenta,
    AnsiColors::Yellow,
    AnsiColors::Green,
    AnsiColors::Blue,
    AnsiColors::Red,
];

const PROJECT_GLYPH: char = '█';
const HIGHLIGHT_GLYPH: char = '▓';
const MISSING_GLYPH: char = '░';

/// One character per bucket. Identities get colors in order of appearance.
pub fn breakdown_bar(
    slices: &[TraceBreakdownSlice],
    highlight: Option<&HighlightState>,
    color: bool,
) -> String {
    let mut seen: Vec<SliceKey> = Vec::new();
    let mut out = String::new();
    for slice in slices {
        let width = slice.slice_width();
        let Some(key) = slice.key() else {
            let cell = MISSING_GLYPH.to_string().repeat(width);
            out.push_str(&if color { cell.dimmed().to_string() } else { cell });
            continue;
        };

        let idx = match seen.iter().position(|k| *k == key) {
            Some(idx) => idx,
            None => {
                seen.push(key);
                seen.len() - 1
            }
        };
        let highlighted = highlight.is_some_and(|h| h.is_highlighted(slice));
        let glyph = if highlighted { HIGHLIGHT_GLYPH } else { PROJECT_GLYPH };
        let cell = glyph.to_string().repeat(width);
        if color {
            let colored = cell.color(SLICE_COLORS[idx % SLICE_COLORS.len()]);
            if highlighted {
                out.push_str(&colored.bold().to_string());
            } else {
                out.push_str(&colored.to_string());
            }
        } else {
            out.push_str(&cell);
        }
    }
    out
}

pub fn slice_legend(slices: &[TraceBreakdownSlice]) -> String {
    slices
        .iter()
        .map(|s| format!("{} {}", s.label(), format_duration_ms(s.duration())))
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn print_traces_human(state: &TraceListState, timestamp_format: &str, color: bool) {
    match state {
        TraceListState::Failed(failure) => eprintln!("error: {failure}"),
        TraceListState::Empty => println!("no results"),
        TraceListState::Loaded(page) => {
            for trace in &page.items {
                print_trace_row(trace, timestamp_format, color);
            }
            let more = if page.has_next { ", more on next page" } else { "" };
            println!(
                "-- page {} ({} of {} traces{more}) --",
                page.page,
                page.items.len(),
                page.total
            );
        }
    }
}

fn print_trace_row(trace: &TraceResult, timestamp_format: &str, color: bool) {
    println!(
        "{} {} \"{}\" project={} duration={} spans={}/{} errors={}",
        short_id(&trace.trace),
        format_timestamp(trace.start, timestamp_format),
        trace.root_label(),
        trace.project.as_deref().unwrap_or("-"),
        format_duration_ms(trace.duration as f64),
        trace.matching_spans,
        trace.num_spans,
        trace.num_errors
    );
    println!("  {}", breakdown_bar(&trace.breakdowns, None, color));
    println!("  {}", slice_legend(&trace.breakdowns));
}

pub fn traces_json(state: &TraceListState) -> serde_json::Value {
    match state {
        TraceListState::Empty => json!({ "state": "empty", "traces": [] }),
        TraceListState::Failed(failure) => json!({ "state": "failed", "error": failure }),
        TraceListState::Loaded(page) => json!({
            "state": "loaded",
            "page": page.page,
            "perPage": page.per_page,
            "total": page.total,
            "hasNext": page.has_next,
            "traces": page.items,
        }),
    }
}

pub struct SpanView<'a> {
    pub page: &'a SpanPage,
    pub extra_fields: &'a [String],
    pub breakdown: &'a [TraceBreakdownSlice],
    pub highlight: Option<&'a HighlightState>,
}

pub fn print_spans_human(view: &SpanView<'_>, color: bool) {
    let page = view.page;
    if page.is_empty() {
        println!("no spans for trace {}", page.trace_id);
        return;
    }

    println!(
        "TRACE {} spans={} matching={}",
        page.trace_id,
        page.spans.len(),
        page.matching
    );
    for span in &page.spans {
        let marker = match view.highlight {
            Some(h) if h.current_key() == span.slice_key().as_str() => '>',
            _ => ' ',
        };
        println!("{marker} {}", span_row(span, view.extra_fields));
    }
    if let Some(more) = page.more_label() {
        println!("  {more}");
    }
    println!("  {}", breakdown_bar(view.breakdown, view.highlight, color));
    println!("  {}", slice_legend(view.breakdown));
}

fn span_row(span: &SpanResult, extra_fields: &[String]) -> String {
    let mut row = format!(
        "{} {} {} {} \"{}\"",
        span.id,
        span.project.as_deref().unwrap_or("-"),
        span.op_category
            .as_deref()
            .or(span.sdk_name.as_deref())
            .unwrap_or("-"),
        format_duration_ms(span.duration_ms),
        span.description.as_deref().unwrap_or("")
    );
    for field in extra_fields {
        let value = span.field(field).map(|v| v.render()).unwrap_or_else(|| "-".to_string());
        row.push_str(&format!(" {field}={value}"));
    }
    row
}

pub fn spans_json(view: &SpanView<'_>) -> serde_json::Value {
    json!({
        "traceId": view.page.trace_id,
        "spans": view.page.spans,
        "totalMatching": view.page.total_matching,
        "moreSpans": view.page.more_spans(),
        "matchingFilters": view.page.matching,
        "breakdown": view.breakdown,
        "highlight": view.highlight.map(HighlightState::current_key),
    })
}

pub fn print_chart_human(chart: &Chart) {
    let formatter = SeriesFormatter::from_series(&chart.series);
    for series in &chart.series {
        let mut traits = vec![format!("{:?}", series.kind).to_lowercase()];
        if series.style.line == LineStyle::Dashed {
            traits.push("dashed".to_string());
        }
        if series.style.hatching.is_some() {
            traits.push("hatched".to_string());
        }
        if let Some(stack) = &series.style.stack {
            traits.push(format!("stack={stack}"));
        }
        let last = series
            .points
            .iter()
            .rev()
            .find_map(|p| p.value)
            .map(|v| formatter.format(&series.name, v))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} [{}] points={} last={last}",
            series.id,
            traits.join(","),
            series.len()
        );
    }
    let padded: usize = chart.padding.values().map(|p| p.len()).sum();
    let samples = chart
        .series
        .iter()
        .filter(|s| s.kind == SeriesKind::Scatter)
        .count();
    println!(
        "-- {} buckets, {} provisional, {} padding points, {} sample overlays --",
        chart.axis.len(),
        chart.ingestion_buckets,
        padded,
        samples
    );
}

pub fn print_tooltip_human(tooltip: &Tooltip) {
    println!("{}", tooltip.render());
}
