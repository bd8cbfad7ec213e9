use std::collections::BTreeMap;

use serde::Serialize;
use tracelens_core::model::series::{DisplayType, Series, SeriesKind};
use tracing::debug;

use crate::format::SeriesFormatter;
use crate::ingestion::split_ingestion;
use crate::padding::add_padding;
use crate::scatter::{Sample, scatter_from_samples};
use crate::series::bucket_size_ms;
use crate::tooltip::{PaddingIndex, Tooltip, TooltipParam, aggregate};

const FALLBACK_BUCKET_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    pub display: DisplayType,
    /// Inferred from point spacing when unset.
    pub bucket_size_ms: Option<i64>,
    pub now_ms: i64,
}

/// Render-ready chart: every base series padded and split, sample overlays
/// appended, and padding indices mapped onto the shared x-axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub display: DisplayType,
    pub series: Vec<Series>,
    pub padding: PaddingIndex,
    pub axis: Vec<i64>,
    pub ingestion_buckets: usize,
}

pub fn assemble_chart(
    base: &[Series],
    samples: &BTreeMap<String, Vec<Sample>>,
    opts: ChartOptions,
) -> Chart {
    let mut series = Vec::with_capacity(base.len() * 2);
    let mut padded_at: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    let mut ingestion_buckets = 0;

    for s in base {
        let prepared = if opts.display == DisplayType::Bar {
            s.clone()
        } else {
            let padded = add_padding(s);
            padded_at
                .entry(s.name.clone())
                .or_default()
                .extend(padded.padding.iter().map(|&i| s.points[i].timestamp));
            padded.series
        };

        let bucket = opts
            .bucket_size_ms
            .unwrap_or_else(|| bucket_size_ms(s, FALLBACK_BUCKET_MS));
        let split = split_ingestion(&prepared, bucket, opts.now_ms, opts.display);
        ingestion_buckets = ingestion_buckets.max(split.ingestion_buckets);

        if opts.display == DisplayType::Bar && split.provisional.is_some() {
            // zeroed stable slots of the hatched bar are not data
            let stable_len = split.stable.len();
            padded_at.entry(s.name.clone()).or_default().extend(
                s.points[..stable_len]
                    .iter()
                    .filter(|p| p.value.is_none())
                    .map(|p| p.timestamp),
            );
        }
        series.extend(split.into_series());
    }

    for s in base {
        if let Some(samples) = samples.get(&s.name).filter(|v| !v.is_empty()) {
            series.push(scatter_from_samples(s, samples));
        }
    }

    let mut axis: Vec<i64> = series
        .iter()
        .filter(|s| s.kind != SeriesKind::Scatter)
        .flat_map(|s| s.points.iter().map(|p| p.timestamp))
        .collect();
    axis.sort_unstable();
    axis.dedup();

    let padding = padded_at
        .into_iter()
        .map(|(name, timestamps)| {
            let indices = timestamps
                .iter()
                .filter_map(|ts| axis.binary_search(ts).ok())
                .collect();
            (name, indices)
        })
        .collect();

    debug!(
        series = series.len(),
        buckets = axis.len(),
        ingestion_buckets,
        "assembled chart"
    );

    Chart {
        display: opts.display,
        series,
        padding,
        axis,
        ingestion_buckets,
    }
}

impl Chart {
    /// Bucket containing `timestamp_ms`, if it falls on or after the first one.
    pub fn index_of(&self, timestamp_ms: i64) -> Option<usize> {
        self.axis
            .partition_point(|&ts| ts <= timestamp_ms)
            .checked_sub(1)
    }

    /// Every series value sitting on axis position `index`, in series order.
    pub fn params_at(&self, index: usize) -> Vec<TooltipParam> {
        let Some(&ts) = self.axis.get(index) else {
            return Vec::new();
        };
        self.series
            .iter()
            .flat_map(|s| {
                s.points
                    .iter()
                    .filter(move |p| p.timestamp == ts)
                    .map(move |p| TooltipParam {
                        series_id: s.id.clone(),
                        series_name: s.name.clone(),
                        kind: s.kind,
                        data_index: index,
                        value: p.value,
                        color: s.color.clone(),
                    })
            })
            .collect()
    }

    pub fn tooltip_at(&self, timestamp_ms: i64, timestamp_format: &str) -> Option<Tooltip> {
        let index = self.index_of(timestamp_ms)?;
        let formatter = SeriesFormatter::from_series(&self.series);
        Some(aggregate(
            self.axis[index],
            &self.params_at(index),
            &self.padding,
            &formatter,
            timestamp_format,
        ))
    }
}
