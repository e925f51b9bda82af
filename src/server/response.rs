// src/server/response.rs
use crate::probe::HealthStatus;
use crate::report::Report;
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Body, Response, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// `hh:mm:ss.fffffff`, the duration format dashboards expect.
pub fn format_timespan(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:07}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        duration.subsec_nanos() / 100
    )
}

pub fn render_report(report: &Report) -> Value {
    let mut entries = Map::new();
    for entry in &report.entries {
        let mut rendered = json!({
            "data": entry.data,
            "description": entry.description,
            "duration": format_timespan(entry.duration),
            "status": entry.status,
            "tags": entry.tags,
        });
        if let Some(error) = &entry.error {
            rendered["exception"] = Value::from(error.to_string());
        }
        entries.insert(entry.name.clone(), rendered);
    }

    json!({
        "status": report.overall_status,
        "totalDuration": format_timespan(report.total_duration()),
        "generatedAt": report.generated_at.to_rfc3339(),
        "entries": entries,
    })
}

/// Unhealthy reports are served as 503 so plain pollers need not parse the body.
pub fn status_code(status: HealthStatus) -> StatusCode {
    if status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub fn report_response(report: &Report) -> Result<Response<Body>, hyper::http::Error> {
    Response::builder()
        .status(status_code(report.overall_status))
        .header(CONTENT_TYPE, "application/json")
        .header(CACHE_CONTROL, "no-store")
        .body(Body::from(render_report(report).to_string()))
}

pub fn text_response(status: StatusCode, message: &str) -> Result<Response<Body>, hyper::http::Error> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeError, ProbeOutcome};
    use crate::report::{aggregate, ProbeResult};
    use chrono::Utc;
    use std::collections::BTreeSet;

    #[test]
    fn test_format_timespan() {
        assert_eq!(format_timespan(Duration::ZERO), "00:00:00.0000000");
        assert_eq!(format_timespan(Duration::from_millis(1500)), "00:00:01.5000000");
        assert_eq!(format_timespan(Duration::from_secs(3723)), "01:02:03.0000000");
        assert_eq!(format_timespan(Duration::from_nanos(1_234_567_890)), "00:00:01.2345678");
    }

    #[test]
    fn test_render_report_shape() {
        let ping = ProbeResult::from_outcome(
            "ping",
            BTreeSet::from(["ping".to_string()]),
            ProbeOutcome::healthy(),
            Duration::from_millis(1),
        );
        let kafka = ProbeResult::failed(
            "Kafka",
            BTreeSet::from(["data".to_string(), "message".to_string()]),
            "probe timed out",
            ProbeError::Timeout {
                after: Duration::from_secs(5),
            },
            Duration::from_secs(5),
        );
        let report = aggregate(vec![ping, kafka], Utc::now());

        let body = render_report(&report);
        assert_eq!(body["status"], "Unhealthy");
        assert_eq!(body["totalDuration"], "00:00:05.0000000");
        assert_eq!(body["entries"]["ping"]["status"], "Healthy");
        assert_eq!(body["entries"]["ping"]["tags"], json!(["ping"]));
        assert!(body["entries"]["ping"].get("exception").is_none());
        assert_eq!(body["entries"]["Kafka"]["description"], "probe timed out");
        assert_eq!(body["entries"]["Kafka"]["exception"], "probe timed out after 5s");

        let keys: Vec<_> = body["entries"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["ping", "Kafka"]);

        assert_eq!(status_code(report.overall_status), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_code(HealthStatus::Degraded), StatusCode::OK);
    }
}
