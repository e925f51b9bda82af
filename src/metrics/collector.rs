// src/metrics/collector.rs
use crate::probe::HealthStatus;
use crate::report::{ProbeResult, Report};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use anyhow::Result;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);
        
        Ok(Self {
            registry,
            collector,
        })
    }
    
    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }
    
    pub fn gather(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        buffer
    }
}

/// Current-state gauges and counters; no history is kept here.
pub struct MetricsCollector {
    // Probe metrics
    pub probe_runs_total: IntCounterVec,
    pub probe_duration_seconds: HistogramVec,
    pub probe_status: IntGaugeVec,
    
    // Report metrics
    pub reports_total: IntCounterVec,
    pub report_status: IntGauge,
    pub report_entries: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let probe_runs_total = IntCounterVec::new(
            Opts::new("hc_probe_runs_total", "Total probe invocations by outcome"),
            &["probe", "status"],
        )?;
        registry.register(Box::new(probe_runs_total.clone()))?;
        
        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "hc_probe_duration_seconds",
                "Probe duration in seconds",
            ),
            &["probe"],
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;
        
        let probe_status = IntGaugeVec::new(
            Opts::new(
                "hc_probe_status",
                "Last probe status (0=healthy, 1=degraded, 2=unhealthy)",
            ),
            &["probe"],
        )?;
        registry.register(Box::new(probe_status.clone()))?;
        
        let reports_total = IntCounterVec::new(
            Opts::new("hc_reports_total", "Total reports generated by overall status"),
            &["status"],
        )?;
        registry.register(Box::new(reports_total.clone()))?;
        
        let report_status = IntGauge::new(
            "hc_report_status",
            "Overall status of the last report (0=healthy, 1=degraded, 2=unhealthy)",
        )?;
        registry.register(Box::new(report_status.clone()))?;
        
        let report_entries =
            IntGauge::new("hc_report_entries", "Number of entries in the last report")?;
        registry.register(Box::new(report_entries.clone()))?;
        
        Ok(Self {
            probe_runs_total,
            probe_duration_seconds,
            probe_status,
            reports_total,
            report_status,
            report_entries,
        })
    }
    
    pub fn record_probe(&self, result: &ProbeResult) {
        self.probe_runs_total
            .with_label_values(&[&result.name, result.status.as_str()])
            .inc();
        
        self.probe_duration_seconds
            .with_label_values(&[&result.name])
            .observe(result.duration.as_secs_f64());
        
        self.probe_status
            .with_label_values(&[&result.name])
            .set(result.status.severity());
    }
    
    pub fn record_report(&self, report: &Report) {
        self.reports_total
            .with_label_values(&[report.overall_status.as_str()])
            .inc();
        self.report_status.set(report.overall_status.severity());
        self.report_entries.set(report.entries.len() as i64);
    }
    
    pub fn probe_runs(&self, probe: &str, status: HealthStatus) -> u64 {
        self.probe_runs_total
            .with_label_values(&[probe, status.as_str()])
            .get()
    }
}
