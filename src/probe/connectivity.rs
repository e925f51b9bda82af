// src/probe/connectivity.rs
use super::{Probe, ProbeOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

pub const SQLSERVER_DEFAULT_PORT: u16 = 1433;
pub const KAFKA_DEFAULT_PORT: u16 = 9092;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("empty endpoint")]
    Empty,

    #[error("invalid port in endpoint '{0}'")]
    InvalidPort(String),

    #[error("connection string has no server/host entry")]
    MissingHost,

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

/// A `host:port` pair a connectivity probe dials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `host`, `host:port`, `[v6]:port` or the ADO form `host,port`.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, EndpointError> {
        let input = input.trim();
        let input = input.strip_prefix("tcp:").unwrap_or(input).trim();
        if input.is_empty() {
            return Err(EndpointError::Empty);
        }

        if let Some(rest) = input.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| EndpointError::InvalidUrl(input.to_string()))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port, input)?,
                None => default_port,
            };
            return Ok(Self::new(host, port));
        }

        if let Some((host, port)) = input.split_once(',') {
            return Ok(Self::new(strip_instance(host), parse_port(port, input)?));
        }

        // A bare IPv6 address has more than one colon and no port.
        if input.matches(':').count() == 1 {
            let (host, port) = input.split_once(':').unwrap_or((input, ""));
            return Ok(Self::new(strip_instance(host), parse_port(port, input)?));
        }

        Ok(Self::new(strip_instance(input), default_port))
    }

    /// Resolves the server from either a URL (`postgres://host:5432/db`) or a
    /// `key=value;` connection string (`Server=tcp:host,1433;Database=app`).
    pub fn from_connection_string(input: &str, default_port: u16) -> Result<Self, EndpointError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EndpointError::Empty);
        }

        if input.contains("://") {
            let url = Url::parse(input).map_err(|e| EndpointError::InvalidUrl(e.to_string()))?;
            let host = url.host_str().ok_or(EndpointError::MissingHost)?;
            let host = host.trim_start_matches('[').trim_end_matches(']');
            return Ok(Self::new(host, url.port().unwrap_or(default_port)));
        }

        let mut server = None;
        let mut port = None;
        for pair in input.split(';') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "server" | "data source" | "address" | "addr" | "network address" | "host" => {
                    server = Some(value)
                }
                "port" => port = Some(parse_port(value, input)?),
                _ => {}
            }
        }

        let mut endpoint = Self::parse(server.ok_or(EndpointError::MissingHost)?, default_port)?;
        if let Some(port) = port {
            endpoint.port = port;
        }
        Ok(endpoint)
    }

    /// Parses a comma separated broker list such as `k1:9092,k2:9092`.
    pub fn parse_list(input: &str, default_port: u16) -> Result<Vec<Self>, EndpointError> {
        let endpoints = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Self::parse(s, default_port))
            .collect::<Result<Vec<_>, _>>()?;

        if endpoints.is_empty() {
            return Err(EndpointError::Empty);
        }
        Ok(endpoints)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn parse_port(port: &str, input: &str) -> Result<u16, EndpointError> {
    port.trim()
        .parse()
        .map_err(|_| EndpointError::InvalidPort(input.to_string()))
}

// `host\INSTANCE` names a SQL Server instance, not a different host.
fn strip_instance(host: &str) -> &str {
    host.split('\\').next().unwrap_or(host).trim()
}

/// Minimal handshake against an external dependency.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the endpoint that answered.
    async fn connect(&self) -> anyhow::Result<String>;

    fn endpoints(&self) -> Vec<String>;
}

/// Healthy as soon as any endpoint accepts a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    endpoints: Vec<Endpoint>,
}

impl TcpConnector {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> anyhow::Result<String> {
        let mut failures = Vec::new();

        for endpoint in &self.endpoints {
            match TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await {
                Ok(_) => return Ok(endpoint.to_string()),
                Err(e) => {
                    debug!("Connection to {} failed: {}", endpoint, e);
                    failures.push(format!("{}: {}", endpoint, e));
                }
            }
        }

        if failures.is_empty() {
            anyhow::bail!("no endpoints configured");
        }
        anyhow::bail!("all endpoints unreachable ({})", failures.join("; "))
    }

    fn endpoints(&self) -> Vec<String> {
        self.endpoints.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityKind {
    Database,
    Broker,
    Tcp,
}

impl ConnectivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectivityKind::Database => "database",
            ConnectivityKind::Broker => "broker",
            ConnectivityKind::Tcp => "tcp",
        }
    }
}

/// Dependency-connectivity probe. Has no timeout loop of its own; the
/// executor's timeout and cancellation apply.
pub struct ConnectivityProbe {
    kind: ConnectivityKind,
    connector: Arc<dyn Connector>,
}

impl ConnectivityProbe {
    pub fn new(kind: ConnectivityKind, connector: Arc<dyn Connector>) -> Self {
        Self { kind, connector }
    }

    pub fn database(connection_string: &str) -> Result<Self, EndpointError> {
        let endpoint = Endpoint::from_connection_string(connection_string, SQLSERVER_DEFAULT_PORT)?;
        Ok(Self::new(
            ConnectivityKind::Database,
            Arc::new(TcpConnector::new(vec![endpoint])),
        ))
    }

    pub fn broker(bootstrap_servers: &str) -> Result<Self, EndpointError> {
        let endpoints = Endpoint::parse_list(bootstrap_servers, KAFKA_DEFAULT_PORT)?;
        Ok(Self::new(
            ConnectivityKind::Broker,
            Arc::new(TcpConnector::new(endpoints)),
        ))
    }

    pub fn tcp(endpoint: &str) -> Result<Self, EndpointError> {
        let endpoint = Endpoint::parse(endpoint, 80)?;
        Ok(Self::new(
            ConnectivityKind::Tcp,
            Arc::new(TcpConnector::new(vec![endpoint])),
        ))
    }
}

#[async_trait]
impl Probe for ConnectivityProbe {
    async fn check(&self, cancel: CancellationToken) -> anyhow::Result<ProbeOutcome> {
        let endpoints = Value::from(self.connector.endpoints());

        let connected = tokio::select! {
            _ = cancel.cancelled() => {
                return Ok(ProbeOutcome::unhealthy("connection attempt cancelled")
                    .with_data("endpoints", endpoints));
            }
            connected = self.connector.connect() => connected,
        };

        Ok(match connected {
            Ok(address) => ProbeOutcome::healthy()
                .with_description(format!("{} is reachable", self.kind.as_str()))
                .with_data("endpoints", endpoints)
                .with_data("connected", address),
            Err(e) => ProbeOutcome::unhealthy(format!("{} is unreachable", self.kind.as_str()))
                .with_data("endpoints", endpoints)
                .with_error(format!("{:#}", e)),
        })
    }

    fn kind(&self) -> &'static str {
        self.kind.as_str()
    }
}
