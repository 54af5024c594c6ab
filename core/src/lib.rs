//! Shared data model for the tickflow pipeline.
//!
//! Every stage speaks in these types: the fetcher produces [`Quote`]s, the stream
//! carries them as [`QuotePayload`] JSON, the archiver turns them into
//! [`RawRecord`]s and [`TimeSeriesEntry`]s, and the analyzer derives a [`Signal`].

pub mod models;

pub use models::*;
