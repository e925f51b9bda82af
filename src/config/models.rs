// src/config/models.rs
use crate::probe::EndpointError;
use crate::registry::TagFilter;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("probe names must not be empty")]
    EmptyName,

    #[error("probe '{0}' has a zero timeout")]
    ZeroTimeout(String),

    #[error("probe '{probe}' references unknown http client '{client}'")]
    UnknownClient { probe: String, client: String },

    #[error("probe '{probe}' has invalid http method '{method}'")]
    InvalidMethod { probe: String, method: String },

    #[error("probe '{probe}' has an invalid endpoint: {source}")]
    InvalidEndpoint {
        probe: String,
        #[source]
        source: EndpointError,
    },

    #[error("http client '{0}' is configured more than once")]
    DuplicateClient(String),

    #[error("route '{0}' is configured more than once")]
    DuplicateRoute(String),

    #[error("route '{0}' must start with '/'")]
    InvalidRoute(String),

    #[error("executor default timeout must be greater than zero")]
    ZeroDefaultTimeout,

    #[error("scheduler interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub http_clients: Vec<HttpClientConfig>,
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteConfig>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor.default_timeout_ms == 0 {
            return Err(ConfigError::ZeroDefaultTimeout);
        }

        let mut clients = HashSet::new();
        for client in &self.http_clients {
            if !clients.insert(client.name.as_str()) {
                return Err(ConfigError::DuplicateClient(client.name.clone()));
            }
        }

        for probe in &self.probes {
            if probe.name.trim().is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if probe.timeout_ms == Some(0) {
                return Err(ConfigError::ZeroTimeout(probe.name.clone()));
            }
            if let ProbeKind::Http { client, method, .. } = &probe.kind {
                if !clients.contains(client.as_str()) {
                    return Err(ConfigError::UnknownClient {
                        probe: probe.name.clone(),
                        client: client.clone(),
                    });
                }
                probe.http_method(method)?;
            }
        }

        let mut paths = HashSet::new();
        for route in &self.routes {
            if !route.path.starts_with('/') {
                return Err(ConfigError::InvalidRoute(route.path.clone()));
            }
            if !paths.insert(route.path.as_str()) {
                return Err(ConfigError::DuplicateRoute(route.path.clone()));
            }
        }

        if self.scheduler.enabled && self.scheduler.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_probe_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default)]
    pub run_deadline_ms: Option<u64>,
}

impl ExecutorConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_ms.map(Duration::from_millis)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_probe_timeout_ms(),
            run_deadline_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_jitter_pct")]
    pub jitter_pct: u8,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            jitter_pct: default_jitter_pct(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

/// A named downstream client used by typed http probes.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    pub name: String,
    #[serde(default)]
    pub base_url: Option<Url>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(flatten)]
    pub kind: ProbeKind,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn http_method(&self, method: &str) -> Result<reqwest::Method, ConfigError> {
        let invalid = || ConfigError::InvalidMethod {
            probe: self.name.clone(),
            method: method.to_string(),
        };
        if method.is_empty() {
            return Err(invalid());
        }
        reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeKind {
    Liveness,
    Tcp {
        endpoint: String,
    },
    Database {
        connection_string: String,
    },
    Broker {
        bootstrap_servers: String,
    },
    Http {
        client: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        path: Option<String>,
    },
}

/// An exposure path and the tags it selects; no tags selects every probe.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub path: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl RouteConfig {
    pub fn filter(&self) -> TagFilter {
        match &self.tags {
            Some(tags) => TagFilter::any_of(tags.iter().cloned()),
            None => TagFilter::All,
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_probe_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    120
}

fn default_jitter_pct() -> u8 {
    10
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig {
            path: "/hc".to_string(),
            tags: None,
        },
        RouteConfig {
            path: "/hc/ping".to_string(),
            tags: Some(vec!["ping".to_string()]),
        },
    ]
}
