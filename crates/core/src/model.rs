pub mod series;
pub mod span;
pub mod trace;
