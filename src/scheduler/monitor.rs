// src/scheduler/monitor.rs
use crate::report::Report;
use crate::service::{HealthService, ReportRequest};
use arc_swap::ArcSwapOption;
use rand::Rng;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

/// Periodically evaluates the full report and keeps only the latest one.
pub struct ReportScheduler {
    service: Arc<HealthService>,
    interval: Duration,
    jitter_pct: u8,
    latest: ArcSwapOption<Report>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl ReportScheduler {
    pub fn new(service: Arc<HealthService>, interval: Duration, jitter_pct: u8) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        
        Self {
            service,
            interval,
            jitter_pct: jitter_pct.min(100),
            latest: ArcSwapOption::empty(),
            shutdown_tx,
            shutdown_rx,
        }
    }
    
    pub async fn start(self: Arc<Self>) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        
        info!(
            "Starting report scheduler with interval: {:?}",
            self.interval
        );
        
        loop {
            self.evaluate_now().await;
            
            let delay = self.next_delay();
            debug!("Next evaluation in {:?}", delay);
            
            tokio::select! {
                _ = sleep(delay) => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Report scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }
    
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
    
    /// Runs the full report once and stores it as the latest.
    pub async fn evaluate_now(&self) -> Arc<Report> {
        let report = Arc::new(self.service.report(ReportRequest::all()).await);
        self.latest.store(Some(report.clone()));
        report
    }
    
    pub fn latest(&self) -> Option<Arc<Report>> {
        self.latest.load_full()
    }
    
    /// Interval plus up to `jitter_pct` percent of random jitter.
    fn next_delay(&self) -> Duration {
        let base = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX);
        let max_jitter = (base / 100).saturating_mul(u64::from(self.jitter_pct));
        let jitter = if max_jitter == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=max_jitter)
        };
        
        Duration::from_millis(base.saturating_add(jitter))
    }
}
