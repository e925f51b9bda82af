// src/probe/mod.rs
mod connectivity;
mod http;
mod liveness;
mod outcome;
mod status;

pub use connectivity::{ConnectivityKind, ConnectivityProbe, Connector, Endpoint, EndpointError, TcpConnector};
pub use http::{HttpClientError, HttpClientFactory, HttpClientSettings, NamedClient, TypedHttpProbe};
pub use liveness::LivenessProbe;
pub use outcome::{ProbeData, ProbeError, ProbeOutcome};
pub use status::HealthStatus;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A single health-determining unit of work.
///
/// Implementations must observe `cancel` at their I/O boundary. Returning
/// `Err` is treated as a fault by the executor and never aborts sibling probes.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, cancel: CancellationToken) -> anyhow::Result<ProbeOutcome>;

    fn kind(&self) -> &'static str;
}
