// src/probe/http.rs
use super::{Probe, ProbeOutcome};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

pub const HEALTHY_DESCRIPTION: &str = "downstream API is healthy";
pub const UNHEALTHY_DESCRIPTION: &str = "downstream API is unhealthy";
pub const FAULT_DESCRIPTION: &str = "an error occurred while checking the downstream API";

#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("no http client named '{0}' is configured")]
    UnknownClient(String),

    #[error("failed to build http client '{name}': {source}")]
    Build {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("client '{0}' has no base url and the probe has no absolute target")]
    NoTarget(String),

    #[error("invalid target url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// How a named downstream client is built.
#[derive(Debug, Clone, Default)]
pub struct HttpClientSettings {
    pub base_url: Option<Url>,
    pub timeout: Option<Duration>,
    pub accept_invalid_certs: bool,
}

/// A built client plus the base address requests are resolved against.
#[derive(Debug, Clone)]
pub struct NamedClient {
    pub name: String,
    pub base_url: Option<Url>,
    pub client: Client,
}

impl NamedClient {
    /// Resolves `urn` against the base url; an absent urn targets the base url itself.
    pub fn resolve(&self, urn: Option<&str>) -> Result<Url, HttpClientError> {
        match (&self.base_url, urn) {
            (Some(base), Some(urn)) => Ok(base.join(urn)?),
            (Some(base), None) => Ok(base.clone()),
            (None, Some(urn)) => Ok(Url::parse(urn)?),
            (None, None) => Err(HttpClientError::NoTarget(self.name.clone())),
        }
    }
}

/// Named downstream clients. Each client is built at most once, on first
/// use, and then shared by every probe and run.
#[derive(Debug, Default)]
pub struct HttpClientFactory {
    settings: HashMap<String, HttpClientSettings>,
    clients: DashMap<String, NamedClient>,
}

impl HttpClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, name: impl Into<String>, settings: HttpClientSettings) -> Self {
        self.settings.insert(name.into(), settings);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.settings.contains_key(name)
    }

    pub fn client(&self, name: &str) -> Result<NamedClient, HttpClientError> {
        let settings = self
            .settings
            .get(name)
            .ok_or_else(|| HttpClientError::UnknownClient(name.to_string()))?;

        // The entry holds the shard lock while building, so concurrent first
        // uses cannot build the same client twice.
        match self.clients.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let mut builder = Client::builder();
                if let Some(timeout) = settings.timeout {
                    builder = builder.timeout(timeout);
                }
                if settings.accept_invalid_certs {
                    builder = builder.danger_accept_invalid_certs(true);
                }
                let client = builder.build().map_err(|source| HttpClientError::Build {
                    name: name.to_string(),
                    source,
                })?;

                debug!("Built http client '{}'", name);
                let named = NamedClient {
                    name: name.to_string(),
                    base_url: settings.base_url.clone(),
                    client,
                };
                Ok(entry.insert(named).value().clone())
            }
        }
    }

    pub fn built_count(&self) -> usize {
        self.clients.len()
    }
}

/// The reason line as received; hyper only records it when it is not the
/// canonical phrase for the status code.
fn reason_phrase(response: &reqwest::Response) -> String {
    match response.extensions().get::<hyper::ext::ReasonPhrase>() {
        Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
        None => response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Issues one fixed request against a named downstream client.
pub struct TypedHttpProbe {
    factory: Arc<HttpClientFactory>,
    client_name: String,
    method: Method,
    urn: Option<String>,
}

impl TypedHttpProbe {
    pub fn new(
        factory: Arc<HttpClientFactory>,
        method: Method,
        client_name: impl Into<String>,
        urn: Option<String>,
    ) -> Self {
        Self {
            factory,
            client_name: client_name.into(),
            method,
            urn,
        }
    }

    async fn send(&self) -> anyhow::Result<reqwest::Response> {
        let named = self.factory.client(&self.client_name)?;
        let url = named.resolve(self.urn.as_deref())?;
        let response = named
            .client
            .request(self.method.clone(), url)
            .send()
            .await?;
        Ok(response)
    }

    fn fault_data(&self, outcome: ProbeOutcome) -> ProbeOutcome {
        outcome
            .with_data("clientName", self.client_name.clone())
            .with_data("clientUrn", self.urn.clone().map_or(Value::Null, Value::from))
            .with_data("httpMethod", self.method.as_str())
    }
}

#[async_trait]
impl Probe for TypedHttpProbe {
    async fn check(&self, cancel: CancellationToken) -> anyhow::Result<ProbeOutcome> {
        let sent = tokio::select! {
            _ = cancel.cancelled() => {
                return Ok(self.fault_data(ProbeOutcome::unhealthy("request cancelled")));
            }
            sent = self.send() => sent,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                return Ok(self
                    .fault_data(ProbeOutcome::unhealthy(FAULT_DESCRIPTION))
                    .with_error(format!("{:#}", e)));
            }
        };

        let status = response.status();
        let outcome = if status.is_success() {
            ProbeOutcome::healthy().with_description(HEALTHY_DESCRIPTION)
        } else {
            ProbeOutcome::unhealthy(UNHEALTHY_DESCRIPTION)
        };

        Ok(outcome
            .with_data("url", response.url().to_string())
            .with_data("status", status.as_u16())
            .with_data("reason", reason_phrase(&response)))
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}
