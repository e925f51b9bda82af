// src/scheduler/mod.rs
mod monitor;

pub use monitor::ReportScheduler;
