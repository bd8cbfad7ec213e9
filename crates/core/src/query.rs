use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{QueryFailure, Result, TracelensError};

/// `{"count": v}` cell of an events-stats bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CountValue {
    pub count: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StatsMeta {
    #[serde(default)]
    pub units: BTreeMap<String, Option<String>>,
}

/// One requested aggregate: `[[ts_seconds, [{"count": v}]], ...]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventsStats {
    pub data: Vec<(i64, Vec<CountValue>)>,
    #[serde(default)]
    pub meta: StatsMeta,
}

/// Time-series result keyed by the requested aggregate string.
pub type TimeseriesResponse = BTreeMap<String, EventsStats>;

/// An aggregate like `p95(span.duration)` split into its operation and field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub raw: String,
    pub operation: String,
    pub field: Option<String>,
}

impl Aggregate {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (op, rest) = input
            .split_once('(')
            .ok_or_else(|| TracelensError::Parse(format!("invalid aggregate: {input}")))?;
        let arg = rest
            .strip_suffix(')')
            .ok_or_else(|| TracelensError::Parse(format!("invalid aggregate: {input}")))?;
        if op.is_empty() || !op.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TracelensError::Parse(format!("invalid aggregate: {input}")));
        }
        let field = arg.split(',').next().map(str::trim).filter(|f| !f.is_empty());

        Ok(Self {
            raw: input.to_string(),
            operation: op.to_string(),
            field: field.map(str::to_string),
        })
    }

    /// Operations whose result is a plain event count regardless of field unit.
    pub fn is_count_like(&self) -> bool {
        matches!(
            self.operation.as_str(),
            "count" | "count_unique" | "count_if" | "epm" | "eps" | "spm" | "sps"
        )
    }
}

/// Units of fields the span dataset knows about.
pub fn known_field_unit(field: &str) -> Option<&'static str> {
    match field {
        "span.duration" | "span.self_time" | "transaction.duration" => Some("millisecond"),
        "http.response_content_length" | "http.decoded_response_content_length" => Some("byte"),
        _ => None,
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| TracelensError::Io(format!("read {}: {e}", path.display())))
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = read_file(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| TracelensError::Parse(format!("{}: {e}", path.display())))
}

/// A result file holds either the query result or the error body the server
/// answered with (`{"detail": ...}`).
pub fn read_result_file<T: DeserializeOwned>(
    path: &Path,
) -> Result<std::result::Result<T, QueryFailure>> {
    let raw = read_file(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| TracelensError::Parse(format!("{}: {e}", path.display())))?;
    if value.get("detail").is_some() {
        return Ok(Err(QueryFailure::from_response(None, &raw)));
    }
    let parsed = serde_json::from_value(value).map_err(|e| {
        TracelensError::Parse(format!("unexpected result shape in {}: {e}", path.display()))
    })?;
    Ok(Ok(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_result_file_is_an_io_error() {
        let path = Path::new("/nonexistent/tracelens/result.json");
        let err = read_result_file::<TimeseriesResponse>(path).unwrap_err();
        assert!(matches!(err, TracelensError::Io(_)), "{err}");
        assert!(err.to_string().starts_with("io error: read /nonexistent"));
        let err = read_json_file::<TimeseriesResponse>(path).unwrap_err();
        assert!(matches!(err, TracelensError::Io(_)));
    }

    #[test]
    fn parses_aggregates() {
        let agg = Aggregate::parse("p95(span.duration)").unwrap();
        assert_eq!(agg.operation, "p95");
        assert_eq!(agg.field.as_deref(), Some("span.duration"));
        let agg = Aggregate::parse("count()").unwrap();
        assert_eq!(agg.field, None);
        assert!(agg.is_count_like());
        assert!(Aggregate::parse("p95").is_err());
        assert!(Aggregate::parse("(x)").is_err());
    }

    #[test]
    fn deserializes_events_stats() {
        let raw = r#"{"count()": {"data": [[1700000000, [{"count": 3}]], [1700000060, [{"count": null}]]],
                     "meta": {"units": {"count()": null}}}}"#;
        let parsed: TimeseriesResponse = serde_json::from_str(raw).unwrap();
        let stats = &parsed["count()"];
        assert_eq!(stats.data.len(), 2);
        assert_eq!(stats.data[1].1[0].count, None);
    }

    #[test]
    fn known_units() {
        assert_eq!(known_field_unit("span.duration"), Some("millisecond"));
        assert_eq!(known_field_unit("user"), None);
    }
}
