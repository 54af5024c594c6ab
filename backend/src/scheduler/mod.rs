pub mod periodic;

pub use periodic::{StopHandle, StopSignal, run_periodic};
