use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TracelensError};
use crate::model::span::SpanResult;
use crate::model::trace::RawTrace;

/// `key=glob` filter over span fields, used to count matching spans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpanFilter {
    pub key: String,
    pub value_glob: String,
}

impl SpanFilter {
    pub fn parse(input: &str) -> Result<Self> {
        let (key, value_glob) = input
            .split_once('=')
            .ok_or_else(|| TracelensError::Parse(format!("invalid span filter: {input}")))?;

        if key.trim().is_empty() || value_glob.trim().is_empty() {
            return Err(TracelensError::Parse(format!("invalid span filter: {input}")));
        }

        Ok(Self {
            key: key.trim().to_string(),
            value_glob: value_glob.trim().to_string(),
        })
    }

    pub fn matches_value(&self, value: &str) -> bool {
        Pattern::new(&self.value_glob)
            .map(|p| p.matches(value))
            .unwrap_or(false)
    }

    pub fn matches(&self, span: &SpanResult) -> bool {
        span.field(&self.key)
            .map(|v| self.matches_value(&v.render()))
            .unwrap_or(false)
    }
}

/// All filters must match.
pub fn matches_all(filters: &[SpanFilter], span: &SpanResult) -> bool {
    filters.iter().all(|f| f.matches(span))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// True when the trace interval overlaps the window.
    pub fn overlaps(&self, trace: &RawTrace) -> bool {
        if let Some(since) = self.since
            && trace.end < since.timestamp_millis()
        {
            return false;
        }
        if let Some(until) = self.until
            && trace.start > until.timestamp_millis()
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use super::*;

    fn span() -> SpanResult {
        SpanResult {
            id: "a".to_string(),
            project: Some("api".to_string()),
            transaction_id: None,
            precise_start: 0.0,
            precise_finish: 1.0,
            duration_ms: 1000.0,
            description: Some("GET /v1/orders".to_string()),
            op_category: Some("http".to_string()),
            sdk_name: None,
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn span_filter_parse_and_match() {
        let f = SpanFilter::parse("span.description=GET *").unwrap();
        assert_eq!(f.key, "span.description");
        assert!(f.matches(&span()));
        assert!(!SpanFilter::parse("project=web").unwrap().matches(&span()));
        assert!(!SpanFilter::parse("missing.field=*").unwrap().matches(&span()));
    }

    #[test]
    fn span_filter_rejects_bad_input() {
        assert!(SpanFilter::parse("project").is_err());
        assert!(SpanFilter::parse("=api").is_err());
    }

    #[test]
    fn matches_all_requires_every_filter() {
        let filters = vec![
            SpanFilter::parse("project=api").unwrap(),
            SpanFilter::parse("span.category=ht*").unwrap(),
        ];
        assert!(matches_all(&filters, &span()));
        assert!(matches_all(&[], &span()));
    }

    #[test]
    fn window_overlap() {
        let trace = RawTrace {
            trace: "t".to_string(),
            name: None,
            project: None,
            start: 1_000,
            end: 2_000,
            num_spans: 0,
            matching_spans: 0,
            num_errors: 0,
            num_occurrences: 0,
            breakdowns: None,
            spans: Vec::new(),
        };
        let at = |ms| Utc.timestamp_millis_opt(ms).unwrap();
        let open = TimeWindow {
            since: None,
            until: None,
        };
        assert!(open.overlaps(&trace));
        let window = TimeWindow {
            since: Some(at(1_500)),
            until: None,
        };
        assert!(window.overlaps(&trace));
        let window = TimeWindow {
            since: Some(at(2_500)),
            until: None,
        };
        assert!(!window.overlaps(&trace));
        let window = TimeWindow {
            since: None,
            until: Some(at(500)),
        };
        assert!(!window.overlaps(&trace));
    }
}
