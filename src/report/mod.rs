// src/report/mod.rs
mod aggregator;
mod result;

pub use aggregator::aggregate;
pub use result::{ProbeResult, Report};
