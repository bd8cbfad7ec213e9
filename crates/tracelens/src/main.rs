mod output;
mod telemetry;

use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracelens_chart::{Chart, ChartOptions, Sample, assemble_chart, series_from_response};
use tracelens_core::QueryFailure;
use tracelens_core::config::{BREAKDOWN_SLICES, Config, MAX_SPANS_PER_TRACE, TraceListMode};
use tracelens_core::filter::{SpanFilter, TimeWindow};
use tracelens_core::ids::{SpanId, TraceId};
use tracelens_core::model::series::DisplayType;
use tracelens_core::model::span::{SpanQuery, SpanSearchResult};
use tracelens_core::model::trace::TraceSearchResult;
use tracelens_core::query::{TimeseriesResponse, read_json_file, read_result_file};
use tracelens_core::time::{parse_duration_ms, parse_time_or_relative};
use tracelens_timeline::{
    BreakdownOptions, HighlightState, IngestOptions, SpanPage, TraceListState, normalize_traces,
};
use tracing::debug;

use crate::output::{
    SpanView, print_chart_human, print_spans_human, print_tooltip_human, print_traces_human,
    spans_json, traces_json,
};
use crate::telemetry::init_cli_tracing;

#[derive(Parser, Debug)]
#[command(name = "tracelens")]
#[command(about = "Trace breakdowns, fog-of-war charts and tooltips from query results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true, help = "Config file (default: $XDG_CONFIG_HOME/tracelens/config.toml)")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Trace table with breakdown bars from a trace search result")]
    Traces {
        file: PathBuf,
        #[arg(long, help = "client or server")]
        mode: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        per_page: Option<usize>,
        #[arg(long, default_value_t = BREAKDOWN_SLICES)]
        slices: usize,
        #[arg(long, help = "One slice per bucket instead of merging neighbours")]
        no_coalesce: bool,
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        until: Option<String>,
    },
    #[command(about = "Spans of one trace from a span search result")]
    Spans {
        file: PathBuf,
        #[arg(long)]
        trace: String,
        #[arg(long, default_value_t = MAX_SPANS_PER_TRACE)]
        limit: usize,
        #[arg(long = "field")]
        fields: Vec<String>,
        #[arg(long = "where")]
        where_filters: Vec<String>,
        #[arg(long, help = "Span id whose slice identity is highlighted")]
        highlight: Option<String>,
    },
    #[command(about = "Chart series with ingestion delay split from a time-series result")]
    Chart {
        file: PathBuf,
        #[command(flatten)]
        chart: ChartArgs,
        #[arg(long, help = "JSON object of series name to sample list")]
        samples: Option<PathBuf>,
    },
    #[command(about = "Tooltip text at a timestamp")]
    Tooltip {
        file: PathBuf,
        #[arg(long, help = "RFC3339, epoch millis or a duration ago")]
        at: String,
        #[command(flatten)]
        chart: ChartArgs,
    },
}

#[derive(clap::Args, Debug)]
struct ChartArgs {
    #[arg(long = "y-axis", required = true)]
    y_axes: Vec<String>,
    #[arg(long, default_value = "line")]
    display: String,
    #[arg(long, help = "Bucket size, inferred from the data when omitted")]
    interval: Option<String>,
    #[arg(long, help = "Reference time for the ingestion window (default: now)")]
    now: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing();
    let cfg = load_config(cli.config.as_deref())?;
    let color = std::io::stdout().is_terminal();

    match cli.command {
        Commands::Traces {
            file,
            mode,
            page,
            per_page,
            slices,
            no_coalesce,
            since,
            until,
        } => {
            let opts = IngestOptions {
                mode: match mode {
                    Some(m) => TraceListMode::parse(&m)?,
                    None => cfg.trace_list_mode,
                },
                breakdown: BreakdownOptions {
                    slices: slices.max(1),
                    coalesce: cfg.coalesce_slices && !no_coalesce,
                },
            };
            let window = parse_window(since, until)?;
            let per_page = per_page.unwrap_or(cfg.per_page);

            let result = read_result_file::<TraceSearchResult>(&file)?.map(|found| {
                let raw = found
                    .data
                    .into_iter()
                    .filter(|t| window.overlaps(t))
                    .collect();
                normalize_traces(raw, &opts)
            });
            let state = TraceListState::from_result(result, page, per_page);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&traces_json(&state))?);
            } else {
                print_traces_human(&state, &cfg.timestamp_format, color);
            }
            Ok(())
        }
        Commands::Spans {
            file,
            trace,
            limit,
            fields,
            where_filters,
            highlight,
        } => {
            let trace_id = TraceId::parse(&trace)?;
            let query = SpanQuery::new(trace_id.as_str(), &fields, limit)?;
            let filters = where_filters
                .iter()
                .map(|f| SpanFilter::parse(f))
                .collect::<tracelens_core::Result<Vec<_>>>()?;

            let result = match read_result_file::<SpanSearchResult>(&file)? {
                Ok(result) => result,
                Err(failure) => return print_failure(&failure, cli.json),
            };
            let page = SpanPage::from_search(result, &query.trace_id, Some(query.limit), &filters)?;

            let (start, end) = span_extent(&page);
            let breakdown = page.breakdown(
                start,
                end,
                BreakdownOptions {
                    coalesce: cfg.coalesce_slices,
                    ..BreakdownOptions::default()
                },
            );

            let highlight = match highlight {
                Some(span_id) => Some(highlight_span(&page, &span_id, &cfg)?),
                None => None,
            };

            let view = SpanView {
                page: &page,
                extra_fields: &fields,
                breakdown: &breakdown,
                highlight: highlight.as_ref(),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&spans_json(&view))?);
            } else {
                print_spans_human(&view, color);
            }
            Ok(())
        }
        Commands::Chart {
            file,
            chart,
            samples,
        } => {
            let samples = match samples {
                Some(path) => read_json_file::<BTreeMap<String, Vec<Sample>>>(&path)?,
                None => BTreeMap::new(),
            };
            let chart = match build_chart(&file, &chart, &samples)? {
                Ok(chart) => chart,
                Err(failure) => return print_failure(&failure, cli.json),
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&chart)?);
            } else {
                print_chart_human(&chart);
            }
            Ok(())
        }
        Commands::Tooltip { file, at, chart } => {
            let at_ms = parse_time_or_relative(&at)?.timestamp_millis();
            let chart = match build_chart(&file, &chart, &BTreeMap::new())? {
                Ok(chart) => chart,
                Err(failure) => return print_failure(&failure, cli.json),
            };
            let tooltip = chart
                .tooltip_at(at_ms, &cfg.timestamp_format)
                .with_context(|| format!("{at} is before the first bucket"))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&tooltip)?);
            } else {
                print_tooltip_human(&tooltip);
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            Config::from_file(path).with_context(|| format!("load config {}", path.display()))
        }
        None => Config::load().context("load config"),
    }
}

fn print_failure(failure: &QueryFailure, json: bool) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "error": failure }))?
        );
    } else {
        eprintln!("error: {failure}");
    }
    Ok(())
}

fn parse_window(since: Option<String>, until: Option<String>) -> anyhow::Result<TimeWindow> {
    let since = since.map(|v| parse_time_or_relative(&v)).transpose()?;
    let until = until.map(|v| parse_time_or_relative(&v)).transpose()?;
    Ok(TimeWindow { since, until })
}

fn build_chart(
    file: &Path,
    args: &ChartArgs,
    samples: &BTreeMap<String, Vec<Sample>>,
) -> anyhow::Result<Result<Chart, QueryFailure>> {
    let display = DisplayType::parse(&args.display)
        .with_context(|| format!("invalid display type: {}", args.display))?;
    let bucket_size_ms = args.interval.as_deref().map(parse_duration_ms).transpose()?;
    let now_ms = match &args.now {
        Some(v) => parse_time_or_relative(v)?.timestamp_millis(),
        None => chrono::Utc::now().timestamp_millis(),
    };

    let response = match read_result_file::<TimeseriesResponse>(file)? {
        Ok(response) => response,
        Err(failure) => return Ok(Err(failure)),
    };
    let base = series_from_response(&response, &args.y_axes, display)?;
    Ok(Ok(assemble_chart(
        &base,
        samples,
        ChartOptions {
            display,
            bucket_size_ms,
            now_ms,
        },
    )))
}

/// Window covered by the listed spans, in epoch ms.
fn span_extent(page: &SpanPage) -> (f64, f64) {
    let start = page
        .spans
        .iter()
        .map(|s| s.precise_start * 1000.0)
        .fold(f64::INFINITY, f64::min);
    let end = page
        .spans
        .iter()
        .map(|s| s.precise_finish * 1000.0)
        .fold(f64::NEG_INFINITY, f64::max);
    if start.is_finite() && end.is_finite() {
        (start, end.max(start))
    } else {
        (0.0, 0.0)
    }
}

fn highlight_span(page: &SpanPage, span_id: &str, cfg: &Config) -> anyhow::Result<HighlightState> {
    let span_id = SpanId::parse(span_id)?;
    let span = page
        .spans
        .iter()
        .find(|s| s.id.eq_ignore_ascii_case(span_id.as_str()))
        .with_context(|| format!("span {} is not among the listed spans", span_id.as_str()))?;

    let mut state = HighlightState::new(cfg.highlight_debounce);
    state.subscribe(|key| debug!(key, "highlight changed"));
    state.hover(Some(span.slice_key()), Instant::now());
    Ok(state)
}
