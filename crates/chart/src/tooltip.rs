use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::{self, Write as _};

use chrono::{DateTime, SecondsFormat};
use serde::Serialize;
use tracelens_core::model::series::SeriesKind;

use crate::format::SeriesFormatter;

pub const NO_DATA: &str = "No data available";

/// Padding indices on the shared x-axis, keyed by series name.
pub type PaddingIndex = BTreeMap<String, BTreeSet<usize>>;

/// One series value colliding at the hovered x-axis position.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipParam {
    pub series_id: String,
    pub series_name: String,
    pub kind: SeriesKind,
    pub data_index: usize,
    pub value: Option<f64>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipLine {
    pub series_name: String,
    pub color: String,
    pub value: String,
}

impl fmt::Display for TooltipLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.series_name, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub header: String,
    pub lines: Vec<TooltipLine>,
}

impl Tooltip {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Body lines, or the placeholder when nothing survived filtering.
    pub fn body(&self) -> Vec<String> {
        if self.lines.is_empty() {
            return vec![NO_DATA.to_string()];
        }
        self.lines.iter().map(ToString::to_string).collect()
    }

    pub fn render(&self) -> String {
        let mut out = self.header.clone();
        for line in self.body() {
            out.push('\n');
            out.push_str(&line);
        }
        out
    }
}

/// Builds the hover tooltip for one x-axis position.
///
/// Params are filtered in order: null values, scatter overlays, zeros sitting
/// on a padding index, then repeated series names (first one wins). The
/// stable and provisional halves of a split series share a name, so the
/// last filter collapses them into a single line.
pub fn aggregate(
    timestamp_ms: i64,
    params: &[TooltipParam],
    padding: &PaddingIndex,
    formatter: &SeriesFormatter,
    timestamp_format: &str,
) -> Tooltip {
    let mut seen = HashSet::new();
    let lines = params
        .iter()
        .filter_map(|p| p.value.map(|v| (p, v)))
        .filter(|(p, _)| p.kind != SeriesKind::Scatter)
        .filter(|(p, v)| !(*v == 0.0 && is_padding(padding, &p.series_name, p.data_index)))
        .filter(|(p, _)| seen.insert(p.series_name.as_str()))
        .map(|(p, v)| TooltipLine {
            series_name: p.series_name.clone(),
            color: p.color.clone(),
            value: formatter.format(&p.series_name, v),
        })
        .collect();

    Tooltip {
        header: format_timestamp(timestamp_ms, timestamp_format),
        lines,
    }
}

fn is_padding(padding: &PaddingIndex, series_name: &str, index: usize) -> bool {
    padding
        .get(series_name)
        .is_some_and(|indices| indices.contains(&index))
}

/// UTC timestamp in the given strftime format, RFC3339 when the format is
/// invalid.
pub fn format_timestamp(timestamp_ms: i64, format: &str) -> String {
    let Some(dt) = DateTime::from_timestamp_millis(timestamp_ms) else {
        return timestamp_ms.to_string();
    };
    let mut out = String::new();
    if write!(out, "{}", dt.format(format)).is_err() {
        return dt.to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    out
}
