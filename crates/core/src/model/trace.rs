use serde::{Deserialize, Serialize};

pub const MISSING_TRACE_ROOT: &str = "Missing Trace Root";

/// Identity shared by breakdown slices and span rows for hover highlighting.
///
/// Encoded as a JSON pair so distinct `(project, category)` pairs never
/// collide, and never equal to [`NO_HIGHLIGHT`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SliceKey(String);

pub const NO_HIGHLIGHT: &str = "";

impl SliceKey {
    pub fn new(project: Option<&str>, secondary: Option<&str>) -> Self {
        Self(serde_json::json!([project, secondary]).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SliceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation category wins over SDK name; only one is ever surfaced.
pub fn secondary_identity<'a>(op_category: Option<&'a str>, sdk_name: Option<&'a str>) -> Option<&'a str> {
    op_category.or(sdk_name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TraceBreakdownSlice {
    Project {
        project: Option<String>,
        op_category: Option<String>,
        sdk_name: Option<String>,
        slice_start: usize,
        slice_end: usize,
        start: f64,
        end: f64,
        duration: f64,
        slice_width: usize,
    },
    Missing {
        slice_start: usize,
        slice_end: usize,
        start: f64,
        end: f64,
        duration: f64,
        slice_width: usize,
    },
}

impl TraceBreakdownSlice {
    pub fn missing(slice_start: usize, slice_end: usize, start: f64, end: f64) -> Self {
        Self::Missing {
            slice_start,
            slice_end,
            start,
            end,
            duration: (end - start).max(0.0),
            slice_width: slice_end.saturating_sub(slice_start),
        }
    }

    pub fn project(
        project: Option<String>,
        op_category: Option<String>,
        sdk_name: Option<String>,
        slices: (usize, usize),
        start: f64,
        end: f64,
    ) -> Self {
        let (slice_start, slice_end) = slices;
        Self::Project {
            project,
            op_category,
            sdk_name,
            slice_start,
            slice_end,
            start,
            end,
            duration: (end - start).max(0.0),
            slice_width: slice_end.saturating_sub(slice_start),
        }
    }

    /// Same slice moved to other bucket bounds; true timing is untouched.
    pub fn with_bounds(&self, new_start: usize, new_end: usize) -> Self {
        let mut out = self.clone();
        match &mut out {
            Self::Project {
                slice_start,
                slice_end,
                slice_width,
                ..
            }
            | Self::Missing {
                slice_start,
                slice_end,
                slice_width,
                ..
            } => {
                *slice_start = new_start;
                *slice_end = new_end;
                *slice_width = new_end.saturating_sub(new_start);
            }
        }
        out
    }

    /// Widens the true interval to also cover `[start, end]`.
    pub fn with_timing(&self, new_start: f64, new_end: f64) -> Self {
        let mut out = self.clone();
        match &mut out {
            Self::Project {
                start,
                end,
                duration,
                ..
            }
            | Self::Missing {
                start,
                end,
                duration,
                ..
            } => {
                *start = new_start;
                *end = new_end;
                *duration = (new_end - new_start).max(0.0);
            }
        }
        out
    }

    pub fn slice_start(&self) -> usize {
        match self {
            Self::Project { slice_start, .. } | Self::Missing { slice_start, .. } => *slice_start,
        }
    }

    pub fn slice_end(&self) -> usize {
        match self {
            Self::Project { slice_end, .. } | Self::Missing { slice_end, .. } => *slice_end,
        }
    }

    pub fn slice_width(&self) -> usize {
        match self {
            Self::Project { slice_width, .. } | Self::Missing { slice_width, .. } => *slice_width,
        }
    }

    pub fn start(&self) -> f64 {
        match self {
            Self::Project { start, .. } | Self::Missing { start, .. } => *start,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            Self::Project { end, .. } | Self::Missing { end, .. } => *end,
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Self::Project { duration, .. } | Self::Missing { duration, .. } => *duration,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }

    /// `None` for missing slices, which never take part in highlighting.
    pub fn key(&self) -> Option<SliceKey> {
        match self {
            Self::Project {
                project,
                op_category,
                sdk_name,
                ..
            } => Some(SliceKey::new(
                project.as_deref(),
                secondary_identity(op_category.as_deref(), sdk_name.as_deref()),
            )),
            Self::Missing { .. } => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Project {
                project,
                op_category,
                sdk_name,
                ..
            } => {
                let project = project.as_deref().unwrap_or("unknown");
                match secondary_identity(op_category.as_deref(), sdk_name.as_deref()) {
                    Some(secondary) => format!("{project} ({secondary})"),
                    None => project.to_string(),
                }
            }
            Self::Missing { .. } => "Missing instrumentation".to_string(),
        }
    }
}

/// Interval of one span as input to the breakdown builder, in epoch ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownSpan {
    pub project: Option<String>,
    #[serde(default)]
    pub op_category: Option<String>,
    #[serde(default)]
    pub sdk_name: Option<String>,
    pub start: f64,
    pub end: f64,
}

impl BreakdownSpan {
    pub fn key(&self) -> SliceKey {
        SliceKey::new(
            self.project.as_deref(),
            secondary_identity(self.op_category.as_deref(), self.sdk_name.as_deref()),
        )
    }
}

/// One trace as returned by the trace search endpoint, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrace {
    pub trace: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub num_spans: usize,
    #[serde(default)]
    pub matching_spans: usize,
    #[serde(default)]
    pub num_errors: usize,
    #[serde(default)]
    pub num_occurrences: usize,
    #[serde(default)]
    pub breakdowns: Option<Vec<TraceBreakdownSlice>>,
    #[serde(default)]
    pub spans: Vec<BreakdownSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    pub trace: String,
    pub name: Option<String>,
    pub project: Option<String>,
    pub start: i64,
    pub end: i64,
    pub duration: i64,
    pub num_spans: usize,
    pub matching_spans: usize,
    pub num_errors: usize,
    pub num_occurrences: usize,
    pub breakdowns: Vec<TraceBreakdownSlice>,
}

impl TraceResult {
    pub fn root_label(&self) -> &str {
        self.name.as_deref().unwrap_or(MISSING_TRACE_ROOT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSearchResult {
    pub data: Vec<RawTrace>,
}
