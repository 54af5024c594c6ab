pub mod quote;
pub mod record;
pub mod signal;

pub use quote::{Quote, QuotePayload};
pub use record::{RawRecord, TimeSeriesEntry};
pub use signal::{Signal, SignalKind};
