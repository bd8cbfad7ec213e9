//! Fog of war: the trailing buckets of a series that may still be receiving
//! data are split off into a separately styled provisional series.

use tracelens_core::config::AVERAGE_INGESTION_DELAY_MS;
use tracelens_core::model::series::{DisplayType, Hatching, LineStyle, Series, SeriesPoint};
use tracing::debug;

use crate::color::lighten;

pub const FOG_STACK: &str = "fogOfWar";
const FOG_STROKE_LIGHTEN: f64 = 0.3;

pub fn ingestion_series_id(id: &str) -> String {
    format!("{id}-ingestion")
}

/// Trailing buckets still inside the average ingestion delay.
pub fn ingestion_delay_bucket_count(bucket_size_ms: i64, last_bucket_start: i64, now_ms: i64) -> usize {
    if bucket_size_ms <= 0 {
        return 0;
    }
    let elapsed = now_ms.saturating_sub(last_bucket_start.saturating_add(bucket_size_ms));
    let affected = AVERAGE_INGESTION_DELAY_MS.saturating_sub(elapsed).max(0);
    let buckets = affected / bucket_size_ms + i64::from(affected % bucket_size_ms != 0);
    usize::try_from(buckets).unwrap_or(usize::MAX)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitSeries {
    pub stable: Series,
    pub provisional: Option<Series>,
    pub ingestion_buckets: usize,
}

impl SplitSeries {
    pub fn into_series(self) -> Vec<Series> {
        let mut out = vec![self.stable];
        out.extend(self.provisional);
        out
    }

    /// Reassembles the original points. The anchor point shared by both
    /// halves, and the zeroed bar slots, are taken from the stable side.
    pub fn merge(&self) -> Vec<SeriesPoint> {
        let mut out = self.stable.points.clone();
        if let Some(provisional) = &self.provisional {
            let after = self.stable.last_timestamp();
            out.extend(
                provisional
                    .points
                    .iter()
                    .filter(|p| after.is_none_or(|last| p.timestamp > last))
                    .copied(),
            );
        }
        out
    }
}

pub fn split_ingestion(series: &Series, bucket_size_ms: i64, now_ms: i64, display: DisplayType) -> SplitSeries {
    let Some(last) = series.last_timestamp() else {
        return unsplit(series);
    };
    let buckets = ingestion_delay_bucket_count(bucket_size_ms, last, now_ms);
    if buckets < 1 {
        return unsplit(series);
    }

    let len = series.len();
    let fog = buckets.min(len);
    let stable_len = len - fog;
    let mode = display;
    debug!(series = %series.id, buckets, len, ?mode, "splitting ingestion delay window");

    let stable = series.with_points(series.points[..stable_len].to_vec());
    let mut provisional = match display {
        DisplayType::Bar => {
            // every slot kept so stacked bars still line up
            let points = series
                .points
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    if i < stable_len {
                        SeriesPoint::new(p.timestamp, Some(0.0))
                    } else {
                        *p
                    }
                })
                .collect();
            let mut s = series.with_points(points);
            s.style.hatching = Some(Hatching::default());
            s
        }
        DisplayType::Line | DisplayType::Area => {
            let from = len.saturating_sub(fog + 1);
            let mut s = series.with_points(series.points[from..].to_vec());
            s.style.line = LineStyle::Dashed;
            if display == DisplayType::Area {
                s.style.stack = Some(FOG_STACK.to_string());
                s.style.stroke_color = Some(lighten(&series.color, FOG_STROKE_LIGHTEN));
            }
            s
        }
    };
    provisional.id = ingestion_series_id(&series.id);
    provisional.style.silent = true;

    SplitSeries {
        stable,
        provisional: Some(provisional),
        ingestion_buckets: buckets,
    }
}

fn unsplit(series: &Series) -> SplitSeries {
    SplitSeries {
        stable: series.clone(),
        provisional: None,
        ingestion_buckets: 0,
    }
}
