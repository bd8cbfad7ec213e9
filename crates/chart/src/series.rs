use tracelens_core::Result;
use tracelens_core::model::series::{DisplayType, Series, SeriesPoint, SeriesStyle};
use tracelens_core::query::{Aggregate, TimeseriesResponse, known_field_unit};
use tracing::warn;

pub const PALETTE: &[&str] = &[
    "#444674", "#d6567f", "#f2b712", "#3c74dd", "#f58c46", "#895289", "#2ba185",
];

/// One series per requested aggregate, in request order. Aggregates the
/// response has no data for are skipped.
pub fn series_from_response(
    response: &TimeseriesResponse,
    y_axes: &[String],
    display: DisplayType,
) -> Result<Vec<Series>> {
    let mut out = Vec::with_capacity(y_axes.len());
    for (idx, y_axis) in y_axes.iter().enumerate() {
        let aggregate = Aggregate::parse(y_axis)?;
        let Some(stats) = response.get(y_axis) else {
            warn!(aggregate = %y_axis, "no data returned for requested aggregate");
            continue;
        };

        let unit = stats
            .meta
            .units
            .get(y_axis)
            .cloned()
            .flatten()
            .or_else(|| {
                aggregate
                    .field
                    .as_deref()
                    .and_then(known_field_unit)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "none".to_string());

        let points = stats
            .data
            .iter()
            .map(|(ts, cells)| {
                SeriesPoint::new(
                    ts.saturating_mul(1000),
                    cells.first().and_then(|c| c.count),
                )
            })
            .collect();

        out.push(Series {
            id: y_axis.clone(),
            name: y_axis.clone(),
            color: PALETTE[idx % PALETTE.len()].to_string(),
            unit,
            operation: aggregate.operation,
            kind: display.into(),
            style: SeriesStyle::default(),
            points,
        });
    }
    Ok(out)
}

/// Spacing of the first two buckets, or `fallback_ms` for shorter series.
pub fn bucket_size_ms(series: &Series, fallback_ms: i64) -> i64 {
    match series.points.as_slice() {
        [first, second, ..] if second.timestamp > first.timestamp => {
            second.timestamp - first.timestamp
        }
        _ => fallback_ms,
    }
}
