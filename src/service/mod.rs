// src/service/mod.rs
mod health;

pub use health::{HealthService, ReportRequest};
