pub mod repository;
pub mod repository_sqlx;

pub use repository::TimeSeriesStore;
pub use repository_sqlx::SqlxTimeSeriesStore;
