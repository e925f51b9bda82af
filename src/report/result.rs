// src/report/result.rs
use crate::probe::{HealthStatus, ProbeData, ProbeError, ProbeOutcome};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::time::Duration;

/// Outcome of one probe invocation. Immutable once created.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub name: String,
    pub status: HealthStatus,
    pub description: String,
    pub data: ProbeData,
    pub duration: Duration,
    pub error: Option<ProbeError>,
    pub tags: BTreeSet<String>,
}

impl ProbeResult {
    pub fn from_outcome(
        name: impl Into<String>,
        tags: BTreeSet<String>,
        outcome: ProbeOutcome,
        duration: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            status: outcome.status,
            description: outcome.description.unwrap_or_default(),
            data: outcome.data,
            duration,
            error: outcome.error.map(ProbeError::Check),
            tags,
        }
    }

    /// An unhealthy result produced by the executor rather than the probe.
    pub fn failed(
        name: impl Into<String>,
        tags: BTreeSet<String>,
        description: impl Into<String>,
        error: ProbeError,
        duration: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            description: description.into(),
            data: ProbeData::new(),
            duration,
            error: Some(error),
            tags,
        }
    }
}

/// Aggregated outcome of one run. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct Report {
    pub overall_status: HealthStatus,
    pub entries: Vec<ProbeResult>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Probes run concurrently, so the slowest entry bounds the run.
    pub fn total_duration(&self) -> Duration {
        self.entries
            .iter()
            .map(|e| e.duration)
            .max()
            .unwrap_or_default()
    }

    pub fn count(&self, status: HealthStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    pub fn entry(&self, name: &str) -> Option<&ProbeResult> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn is_healthy(&self) -> bool {
        self.overall_status == HealthStatus::Healthy
    }
}
