//! Metric chart assembly: series from events-stats responses, null padding,
//! the ingestion-delay split and hover tooltips.

pub mod chart;
pub mod color;
pub mod format;
pub mod ingestion;
pub mod padding;
pub mod scatter;
pub mod series;
pub mod tooltip;

pub use chart::{Chart, ChartOptions, assemble_chart};
pub use format::{SeriesFormatter, format_value};
pub use ingestion::{SplitSeries, ingestion_delay_bucket_count, split_ingestion};
pub use scatter::Sample;
pub use series::series_from_response;
pub use tooltip::{Tooltip, TooltipParam, aggregate};
