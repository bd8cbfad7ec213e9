use serde::{Deserialize, Serialize};

/// One bucket of a chart series. `value: None` means no data, which is not `0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: i64,
    pub value: Option<f64>,
}

impl SeriesPoint {
    pub fn new(timestamp: i64, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayType {
    #[default]
    Line,
    Area,
    Bar,
}

impl DisplayType {
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_lowercase().as_str() {
            "line" => Some(Self::Line),
            "area" => Some(Self::Area),
            "bar" => Some(Self::Bar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Line,
    Area,
    Bar,
    Scatter,
}

impl From<DisplayType> for SeriesKind {
    fn from(value: DisplayType) -> Self {
        match value {
            DisplayType::Line => Self::Line,
            DisplayType::Area => Self::Area,
            DisplayType::Bar => Self::Bar,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

/// Diagonal hatching drawn over provisional bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hatching {
    pub dash_x: [f64; 2],
    pub dash_y: [f64; 2],
    pub rotation: f64,
}

impl Default for Hatching {
    fn default() -> Self {
        Self {
            dash_x: [1.0, 0.0],
            dash_y: [3.0, 5.0],
            rotation: -std::f64::consts::FRAC_PI_4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SeriesStyle {
    pub line: LineStyle,
    pub hatching: Option<Hatching>,
    pub stack: Option<String>,
    pub stroke_color: Option<String>,
    /// Silent series do not react to hover on their own.
    pub silent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub id: String,
    pub name: String,
    pub color: String,
    pub unit: String,
    pub operation: String,
    pub kind: SeriesKind,
    pub style: SeriesStyle,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Copy with other points, sharing identity and style.
    pub fn with_points(&self, points: Vec<SeriesPoint>) -> Self {
        Self {
            points,
            ..self.clone()
        }
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }
}
