// src/executor/runner.rs
use crate::metrics::MetricsCollector;
use crate::probe::{HealthStatus, ProbeError};
use crate::registry::ProbeDescriptor;
use crate::report::{aggregate, ProbeResult, Report};
use chrono::Utc;
use std::any::Any;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, timeout_at, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

pub const TIMEOUT_DESCRIPTION: &str = "probe timed out";
pub const DEADLINE_DESCRIPTION: &str = "run deadline exceeded";
pub const FAULT_DESCRIPTION: &str = "probe raised a fault";

// Stand-in for limits too large to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Which limit ends a probe invocation first.
#[derive(Debug, Clone, Copy)]
enum Limit {
    Timeout { at: Instant, after: Duration },
    Deadline { at: Instant },
}

impl Limit {
    fn at(self) -> Instant {
        match self {
            Limit::Timeout { at, .. } | Limit::Deadline { at } => at,
        }
    }

    fn expired(self, descriptor: &ProbeDescriptor, elapsed: Duration) -> ProbeResult {
        let (description, error) = match self {
            Limit::Timeout { after, .. } => (TIMEOUT_DESCRIPTION, ProbeError::Timeout { after }),
            Limit::Deadline { .. } => (DEADLINE_DESCRIPTION, ProbeError::DeadlineExceeded),
        };
        ProbeResult::failed(
            descriptor.name.clone(),
            descriptor.tags.clone(),
            description,
            error,
            elapsed,
        )
    }
}

/// Runs a selection of probes concurrently, one attempt each, and folds
/// the results into a report in input order.
#[derive(Clone)]
pub struct Executor {
    default_timeout: Duration,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Executor {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Always returns a well-formed report. Faults, panics, timeouts and an
    /// elapsed `deadline` all become Unhealthy entries.
    pub async fn run(
        &self,
        descriptors: &[Arc<ProbeDescriptor>],
        deadline: Option<Duration>,
    ) -> Report {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let deadline_at = deadline.and_then(|d| started.checked_add(d));
        let run_token = CancellationToken::new();

        debug!(%run_id, "Running {} probes", descriptors.len());

        let tasks: Vec<(Limit, CancellationToken, JoinHandle<ProbeResult>)> = descriptors
            .iter()
            .map(|descriptor| {
                let limit = self.limit_for(descriptor, started, deadline_at);
                let token = run_token.child_token();
                let handle = tokio::spawn(invoke(descriptor.clone(), token.clone(), limit));
                (limit, token, handle)
            })
            .collect();

        // Tasks enforce their own limit; the timeout here only matters when a
        // probe blocks its worker thread and never yields.
        let mut results = Vec::with_capacity(tasks.len());
        for (descriptor, (limit, token, mut handle)) in descriptors.iter().zip(tasks) {
            let result = match timeout_at(limit.at(), &mut handle).await {
                Ok(joined) => from_join(descriptor, joined, started.elapsed()),
                Err(_) => {
                    token.cancel();
                    handle.abort();
                    limit.expired(descriptor, started.elapsed())
                }
            };
            self.log_result(run_id, &result);
            results.push(result);
        }
        run_token.cancel();

        let report = aggregate(results, Utc::now());
        if let Some(metrics) = &self.metrics {
            report.entries.iter().for_each(|r| metrics.record_probe(r));
            metrics.record_report(&report);
        }

        info!(
            %run_id,
            "Health report complete: {} ({} healthy, {} degraded, {} unhealthy) in {:?}",
            report.overall_status,
            report.count(HealthStatus::Healthy),
            report.count(HealthStatus::Degraded),
            report.count(HealthStatus::Unhealthy),
            started.elapsed()
        );

        report
    }

    fn limit_for(
        &self,
        descriptor: &ProbeDescriptor,
        started: Instant,
        deadline_at: Option<Instant>,
    ) -> Limit {
        let after = descriptor.timeout.unwrap_or(self.default_timeout);
        let timeout_at = started
            .checked_add(after)
            .unwrap_or_else(|| started + FAR_FUTURE);

        match deadline_at {
            Some(at) if at < timeout_at => Limit::Deadline { at },
            _ => Limit::Timeout {
                at: timeout_at,
                after,
            },
        }
    }

    fn log_result(&self, run_id: Uuid, result: &ProbeResult) {
        match (&result.status, &result.error) {
            (HealthStatus::Healthy, _) => {
                debug!(%run_id, "Probe {} is healthy ({:?})", result.name, result.duration)
            }
            (status, Some(error)) => warn!(
                %run_id,
                "Probe {} is {}: {} ({})",
                result.name, status, result.description, error
            ),
            (status, None) => warn!(
                %run_id,
                "Probe {} is {}: {}",
                result.name, status, result.description
            ),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

/// One probe attempt inside its own task. The token fires when the limit
/// elapses so the probe can abandon in-flight I/O.
async fn invoke(descriptor: Arc<ProbeDescriptor>, token: CancellationToken, limit: Limit) -> ProbeResult {
    let started = Instant::now();

    let checked = tokio::select! {
        biased;
        checked = descriptor.probe.check(token.clone()) => checked,
        _ = sleep_until(limit.at()) => {
            token.cancel();
            return limit.expired(&descriptor, started.elapsed());
        }
    };

    match checked {
        Ok(outcome) => ProbeResult::from_outcome(
            descriptor.name.clone(),
            descriptor.tags.clone(),
            outcome,
            started.elapsed(),
        ),
        Err(e) => ProbeResult::failed(
            descriptor.name.clone(),
            descriptor.tags.clone(),
            FAULT_DESCRIPTION,
            ProbeError::Fault(format!("{:#}", e)),
            started.elapsed(),
        ),
    }
}

fn from_join(
    descriptor: &ProbeDescriptor,
    joined: Result<ProbeResult, JoinError>,
    elapsed: Duration,
) -> ProbeResult {
    match joined {
        Ok(result) => result,
        Err(e) => {
            let error = if e.is_panic() {
                ProbeError::Panicked(panic_message(e.into_panic()))
            } else {
                ProbeError::Fault(e.to_string())
            };
            ProbeResult::failed(
                descriptor.name.clone(),
                descriptor.tags.clone(),
                FAULT_DESCRIPTION,
                error,
                elapsed,
            )
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
