// src/lib.rs
pub mod config;
pub mod executor;
pub mod metrics;
pub mod probe;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod server;
pub mod service;
