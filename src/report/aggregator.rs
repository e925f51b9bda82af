// src/report/aggregator.rs
use super::result::{ProbeResult, Report};
use crate::probe::HealthStatus;
use chrono::{DateTime, Utc};

/// Folds results into a report whose overall status is the worst entry
/// status, or Healthy when there are no entries.
///
/// Pure: entries keep their input order and duplicate names pass through.
pub fn aggregate(results: Vec<ProbeResult>, generated_at: DateTime<Utc>) -> Report {
    let overall_status = results
        .iter()
        .map(|r| r.status)
        .fold(HealthStatus::Healthy, HealthStatus::worst);

    Report {
        overall_status,
        entries: results,
        generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeError, ProbeOutcome};
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn result(name: &str, status: HealthStatus) -> ProbeResult {
        ProbeResult::from_outcome(
            name,
            BTreeSet::new(),
            ProbeOutcome::new(status),
            Duration::from_millis(5),
        )
    }

    fn rollup(statuses: &[HealthStatus]) -> HealthStatus {
        let results = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| result(&format!("p{}", i), *s))
            .collect();
        aggregate(results, Utc::now()).overall_status
    }

    #[test]
    fn test_severity_rollup() {
        use HealthStatus::*;

        assert_eq!(rollup(&[]), Healthy);
        assert_eq!(rollup(&[Healthy]), Healthy);
        assert_eq!(rollup(&[Healthy, Degraded]), Degraded);
        assert_eq!(rollup(&[Healthy, Degraded, Unhealthy]), Unhealthy);
        assert_eq!(rollup(&[Unhealthy, Healthy]), Unhealthy);
    }

    #[test]
    fn test_duplicates_and_order_pass_through() {
        let at = Utc::now();
        let report = aggregate(
            vec![
                result("SqlServer", HealthStatus::Healthy),
                result("ping", HealthStatus::Degraded),
                result("SqlServer", HealthStatus::Healthy),
            ],
            at,
        );

        let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["SqlServer", "ping", "SqlServer"]);
        assert_eq!(report.overall_status, HealthStatus::Degraded);
        assert_eq!(report.generated_at, at);
        assert_eq!(report.count(HealthStatus::Healthy), 2);
    }

    #[test]
    fn test_deterministic() {
        let at = Utc::now();
        let input = vec![
            result("a", HealthStatus::Degraded),
            ProbeResult::failed(
                "b",
                BTreeSet::new(),
                "probe timed out",
                ProbeError::Timeout {
                    after: Duration::from_millis(50),
                },
                Duration::from_millis(50),
            ),
        ];

        let first = aggregate(input.clone(), at);
        let second = aggregate(input, at);
        assert_eq!(first.overall_status, second.overall_status);
        assert_eq!(first.total_duration(), Duration::from_millis(50));
        assert_eq!(
            first.entries.iter().map(|e| e.status).collect::<Vec<_>>(),
            second.entries.iter().map(|e| e.status).collect::<Vec<_>>()
        );
    }
}
