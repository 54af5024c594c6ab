pub mod analyzer;
pub mod trend;

pub use analyzer::{CycleOutcome, TrendAnalyzer};
pub use trend::{Analysis, TrendParams};
