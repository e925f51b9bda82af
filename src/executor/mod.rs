// src/executor/mod.rs
mod runner;

pub use runner::{Executor, DEADLINE_DESCRIPTION, DEFAULT_PROBE_TIMEOUT, FAULT_DESCRIPTION, TIMEOUT_DESCRIPTION};
