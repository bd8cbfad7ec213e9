pub mod breakdown;
pub mod highlight;
pub mod spans;
pub mod traces;

pub use breakdown::{BreakdownOptions, build_breakdown};
pub use highlight::HighlightState;
pub use spans::SpanPage;
pub use traces::{IngestOptions, TraceListState, normalize_traces};
