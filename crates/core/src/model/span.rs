use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TracelensError};
use crate::model::trace::{BreakdownSpan, SliceKey, secondary_identity};
use crate::time::precise_seconds_to_ms;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl FieldValue {
    fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::String(s),
            other => Self::String(other.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Null => "-".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
        }
    }
}

/// One span row from a span search scoped to a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanResult {
    pub id: String,
    pub project: Option<String>,
    pub transaction_id: Option<String>,
    pub precise_start: f64,
    pub precise_finish: f64,
    pub duration_ms: f64,
    pub description: Option<String>,
    pub op_category: Option<String>,
    pub sdk_name: Option<String>,
    /// Remaining queried fields, keyed by the requested field name.
    pub fields: BTreeMap<String, FieldValue>,
}

const ID: &str = "id";
const PROJECT: &str = "project";
const TRANSACTION_ID: &str = "transaction.id";
const PRECISE_START: &str = "precise.start_ts";
const PRECISE_FINISH: &str = "precise.finish_ts";
const DURATION: &str = "span.duration";
const DESCRIPTION: &str = "span.description";
const CATEGORY: &str = "span.category";
const SDK_NAME: &str = "sdk.name";

pub const DEFAULT_SPAN_FIELDS: &[&str] = &[
    ID,
    PROJECT,
    TRANSACTION_ID,
    PRECISE_START,
    PRECISE_FINISH,
    DURATION,
    DESCRIPTION,
    CATEGORY,
    SDK_NAME,
];

impl SpanResult {
    pub fn from_row(row: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut fields: BTreeMap<String, FieldValue> = row
            .into_iter()
            .map(|(k, v)| (k, FieldValue::from_json(v)))
            .collect();

        let id = take_string(&mut fields, ID)
            .ok_or_else(|| TracelensError::Parse("span row without id".to_string()))?;
        let precise_start = take_number(&mut fields, PRECISE_START).ok_or_else(|| {
            TracelensError::Parse(format!("span {id} missing {PRECISE_START}"))
        })?;
        let precise_finish = take_number(&mut fields, PRECISE_FINISH).ok_or_else(|| {
            TracelensError::Parse(format!("span {id} missing {PRECISE_FINISH}"))
        })?;
        let duration_ms = take_number(&mut fields, DURATION)
            .unwrap_or_else(|| precise_seconds_to_ms(precise_finish - precise_start).max(0.0));

        Ok(Self {
            project: take_string(&mut fields, PROJECT),
            transaction_id: take_string(&mut fields, TRANSACTION_ID),
            description: take_string(&mut fields, DESCRIPTION),
            op_category: take_string(&mut fields, CATEGORY),
            sdk_name: take_string(&mut fields, SDK_NAME),
            id,
            precise_start,
            precise_finish,
            duration_ms,
            fields,
        })
    }

    /// Same identity the breakdown bar uses, so hovering a row lights up its slice.
    pub fn slice_key(&self) -> SliceKey {
        SliceKey::new(
            self.project.as_deref(),
            secondary_identity(self.op_category.as_deref(), self.sdk_name.as_deref()),
        )
    }

    /// Looks up any queried field, including the well-known ones.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        let text = |v: &Option<String>| {
            Some(v.clone().map(FieldValue::String).unwrap_or(FieldValue::Null))
        };
        match name {
            ID => Some(FieldValue::String(self.id.clone())),
            PROJECT => text(&self.project),
            TRANSACTION_ID => text(&self.transaction_id),
            DESCRIPTION => text(&self.description),
            CATEGORY => text(&self.op_category),
            SDK_NAME => text(&self.sdk_name),
            PRECISE_START => Some(FieldValue::Number(self.precise_start)),
            PRECISE_FINISH => Some(FieldValue::Number(self.precise_finish)),
            DURATION => Some(FieldValue::Number(self.duration_ms)),
            other => self.fields.get(other).cloned(),
        }
    }
}

impl From<&SpanResult> for BreakdownSpan {
    fn from(span: &SpanResult) -> Self {
        Self {
            project: span.project.clone(),
            op_category: span.op_category.clone(),
            sdk_name: span.sdk_name.clone(),
            start: precise_seconds_to_ms(span.precise_start),
            end: precise_seconds_to_ms(span.precise_finish),
        }
    }
}

fn take_string(fields: &mut BTreeMap<String, FieldValue>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        FieldValue::String(s) => Some(s),
        FieldValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn take_number(fields: &mut BTreeMap<String, FieldValue>, key: &str) -> Option<f64> {
    match fields.remove(key)? {
        FieldValue::Number(n) => Some(n),
        FieldValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Field list for a span search. Names are checked here so the
/// rendering side can trust every key it looks up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanQuery {
    pub trace_id: String,
    pub fields: Vec<String>,
    pub limit: usize,
}

impl SpanQuery {
    pub fn new(trace_id: &str, extra_fields: &[String], limit: usize) -> Result<Self> {
        let mut fields: Vec<String> = DEFAULT_SPAN_FIELDS.iter().map(|f| f.to_string()).collect();
        for field in extra_fields {
            validate_field_name(field)?;
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }
        if limit == 0 {
            return Err(TracelensError::InvalidArgument(
                "span limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            trace_id: trace_id.to_string(),
            fields,
            limit,
        })
    }
}

pub fn validate_field_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':' | '(' | ')' | ','));
    if valid {
        Ok(())
    } else {
        Err(TracelensError::InvalidArgument(format!(
            "invalid field name: {name:?}"
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpanSearchMeta {
    #[serde(default)]
    pub total: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanSearchResult {
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub meta: SpanSearchMeta,
}
