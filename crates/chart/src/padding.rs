use std::collections::BTreeSet;

use tracelens_core::model::series::{Series, SeriesPoint};

#[derive(Debug, Clone, PartialEq)]
pub struct Padded {
    pub series: Series,
    /// Indices whose `0` is synthetic and must never show up as data.
    pub padding: BTreeSet<usize>,
}

/// Replaces interior nulls next to a non-zero neighbour with a padding zero so
/// a line drops to the axis instead of bridging the gap. Nulls at either edge
/// stay null.
pub fn add_padding(series: &Series) -> Padded {
    let points = &series.points;
    let non_zero = |i: usize| points[i].value.is_some_and(|v| v != 0.0);

    let mut padding = BTreeSet::new();
    let padded = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let interior = i > 0 && i + 1 < points.len();
            if p.value.is_none() && interior && (non_zero(i - 1) || non_zero(i + 1)) {
                padding.insert(i);
                SeriesPoint::new(p.timestamp, Some(0.0))
            } else {
                *p
            }
        })
        .collect();

    Padded {
        series: series.with_points(padded),
        padding,
    }
}
