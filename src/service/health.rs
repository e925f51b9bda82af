// src/service/health.rs
use crate::executor::Executor;
use crate::registry::{ProbeRegistry, TagFilter};
use crate::report::Report;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A report request: which probes, and how long the caller will wait.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub filter: TagFilter,
    pub timeout: Option<Duration>,
}

impl ReportRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn tagged(tag: impl Into<String>) -> Self {
        Self::filtered(TagFilter::tag(tag))
    }

    pub fn filtered(filter: TagFilter) -> Self {
        Self {
            filter,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Report-request boundary: selects from the registry and runs the executor.
pub struct HealthService {
    registry: Arc<ProbeRegistry>,
    executor: Executor,
    run_deadline: Option<Duration>,
}

impl HealthService {
    pub fn new(registry: Arc<ProbeRegistry>, executor: Executor) -> Self {
        Self {
            registry,
            executor,
            run_deadline: None,
        }
    }

    /// Deadline applied to every run unless the caller asks for a shorter one.
    pub fn with_run_deadline(mut self, deadline: Duration) -> Self {
        self.run_deadline = Some(deadline);
        self
    }

    pub async fn report(&self, request: ReportRequest) -> Report {
        let selected = self.registry.select(&request.filter);
        let deadline = match (self.run_deadline, request.timeout) {
            (Some(configured), Some(requested)) => Some(configured.min(requested)),
            (configured, requested) => configured.or(requested),
        };

        debug!(
            "Report requested with filter {:?}: {} of {} probes selected, deadline {:?}",
            request.filter,
            selected.len(),
            self.registry.len(),
            deadline
        );

        self.executor.run(&selected, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{HealthStatus, LivenessProbe};
    use crate::registry::ProbeDescriptor;

    #[tokio::test]
    async fn test_tagged_request_runs_matching_probes_only() {
        let registry = Arc::new(ProbeRegistry::new());
        registry
            .register(ProbeDescriptor::new("ping", LivenessProbe).with_tags(["ping"]))
            .unwrap();
        registry
            .register(ProbeDescriptor::new("alive", LivenessProbe).with_tags(["other"]))
            .unwrap();

        let service = HealthService::new(registry, Executor::default());

        let report = service.report(ReportRequest::tagged("ping")).await;
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].name, "ping");
        assert_eq!(report.overall_status, HealthStatus::Healthy);

        let full = service.report(ReportRequest::all()).await;
        assert_eq!(full.entries.len(), 2);
    }
}
