pub mod analysis;
pub mod app;
pub mod archive;
pub mod config;
pub mod db;
pub mod handlers;
pub mod market;
pub mod metrics;
pub mod notify;
pub mod scheduler;
pub mod stream;
pub mod timeseries;

pub mod error;
pub mod logger;
pub mod time;
