// src/probe/liveness.rs
use super::{Probe, ProbeOutcome};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Answers "is the process alive" without touching any dependency.
#[derive(Debug, Clone, Copy, Default)]
pub struct LivenessProbe;

impl LivenessProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Probe for LivenessProbe {
    async fn check(&self, _cancel: CancellationToken) -> anyhow::Result<ProbeOutcome> {
        Ok(ProbeOutcome::healthy())
    }

    fn kind(&self) -> &'static str {
        "liveness"
    }
}
