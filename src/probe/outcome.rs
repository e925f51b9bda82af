// src/probe/outcome.rs
use super::status::HealthStatus;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Auxiliary diagnostic data attached to a probe result.
pub type ProbeData = serde_json::Map<String, Value>;

/// What a probe reports back to the executor.
#[derive(Debug, Clone, Default)]
pub struct ProbeOutcome {
    pub status: HealthStatus,
    pub description: Option<String>,
    pub data: ProbeData,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn healthy() -> Self {
        Self::new(HealthStatus::Healthy)
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self::new(HealthStatus::Unhealthy).with_description(description)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Error detail recorded on an unhealthy result. None of these ever
/// propagate past the executor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("probe timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("run deadline exceeded")]
    DeadlineExceeded,

    #[error("probe fault: {0}")]
    Fault(String),

    #[error("probe panicked: {0}")]
    Panicked(String),

    /// Failure detail reported by the probe itself, e.g. a refused connection.
    #[error("{0}")]
    Check(String),
}

impl ProbeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout { .. } | ProbeError::DeadlineExceeded)
    }
}
