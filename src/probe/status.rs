// src/probe/status.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered by severity: `Healthy < Degraded < Unhealthy`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Worst of the two.
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        self.max(other)
    }

    /// Healthy and Degraded still serve traffic.
    pub fn is_operational(self) -> bool {
        self != HealthStatus::Unhealthy
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Unhealthy => "Unhealthy",
        }
    }

    /// Gauge value exported by the metrics collector.
    pub fn severity(self) -> i64 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
