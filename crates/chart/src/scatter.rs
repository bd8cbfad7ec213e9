use serde::{Deserialize, Serialize};
use tracelens_core::model::series::{Series, SeriesKind, SeriesPoint, SeriesStyle};

/// One sampled span plotted over a metric chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
    pub span_id: String,
    #[serde(default)]
    pub project: Option<String>,
}

pub fn samples_series_id(id: &str) -> String {
    format!("{id}-samples")
}

/// Sample overlay for `base`. It keeps the base name; tooltips skip it
/// because samples carry their own hover card.
pub fn scatter_from_samples(base: &Series, samples: &[Sample]) -> Series {
    let mut points: Vec<SeriesPoint> = samples
        .iter()
        .map(|s| SeriesPoint::new(s.timestamp, Some(s.value)))
        .collect();
    points.sort_by_key(|p| p.timestamp);

    Series {
        id: samples_series_id(&base.id),
        name: base.name.clone(),
        color: base.color.clone(),
        unit: base.unit.clone(),
        operation: base.operation.clone(),
        kind: SeriesKind::Scatter,
        style: SeriesStyle {
            silent: false,
            ..SeriesStyle::default()
        },
        points,
    }
}
