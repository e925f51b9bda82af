// src/config/probes.rs
use super::models::{Config, ConfigError, ProbeConfig, ProbeKind};
use crate::probe::{
    ConnectivityProbe, HttpClientFactory, HttpClientSettings, LivenessProbe, Probe, TypedHttpProbe,
};
use crate::registry::{ProbeDescriptor, ProbeRegistry};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Named clients are declared here and built lazily, once each.
pub fn build_client_factory(config: &Config) -> HttpClientFactory {
    config
        .http_clients
        .iter()
        .fold(HttpClientFactory::new(), |factory, client| {
            factory.with_client(
                client.name.clone(),
                HttpClientSettings {
                    base_url: client.base_url.clone(),
                    timeout: client.timeout_ms.map(Duration::from_millis),
                    accept_invalid_certs: client.accept_invalid_certs,
                },
            )
        })
}

pub fn build_probe(
    config: &ProbeConfig,
    factory: &Arc<HttpClientFactory>,
) -> Result<Arc<dyn Probe>, ConfigError> {
    let invalid_endpoint = |source| ConfigError::InvalidEndpoint {
        probe: config.name.clone(),
        source,
    };

    let probe: Arc<dyn Probe> = match &config.kind {
        ProbeKind::Liveness => Arc::new(LivenessProbe::new()),
        ProbeKind::Tcp { endpoint } => {
            Arc::new(ConnectivityProbe::tcp(endpoint).map_err(invalid_endpoint)?)
        }
        ProbeKind::Database { connection_string } => {
            Arc::new(ConnectivityProbe::database(connection_string).map_err(invalid_endpoint)?)
        }
        ProbeKind::Broker { bootstrap_servers } => {
            Arc::new(ConnectivityProbe::broker(bootstrap_servers).map_err(invalid_endpoint)?)
        }
        ProbeKind::Http { client, method, path } => {
            if !factory.contains(client) {
                return Err(ConfigError::UnknownClient {
                    probe: config.name.clone(),
                    client: client.clone(),
                });
            }
            Arc::new(TypedHttpProbe::new(
                factory.clone(),
                config.http_method(method)?,
                client.clone(),
                path.clone(),
            ))
        }
    };

    Ok(probe)
}

/// Builds every configured probe and registers it. A duplicate name fails
/// startup.
pub fn build_registry(config: &Config, factory: Arc<HttpClientFactory>) -> Result<ProbeRegistry> {
    let registry = ProbeRegistry::new();

    for probe_config in &config.probes {
        let probe = build_probe(probe_config, &factory)?;
        let mut descriptor = ProbeDescriptor::from_arc(probe_config.name.clone(), probe)
            .with_tags(probe_config.tags.iter().cloned());
        if let Some(timeout) = probe_config.timeout() {
            descriptor = descriptor.with_timeout(timeout);
        }
        registry.register(descriptor)?;
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::registry::{RegistryError, TagFilter};

    const CONFIG: &str = r#"
executor:
  default_timeout_ms: 2000
  run_deadline_ms: 10000
http_clients:
  - name: IProxyClient
    base_url: "http://proxy.internal/"
  - name: IPixClient
    base_url: "https://pix.internal/api/"
    timeout_ms: 3000
probes:
  - name: ping
    kind: liveness
    tags: [ping]
  - name: SqlServer
    kind: database
    connection_string: "Server=tcp:sql.internal,1433;Database=pix"
    tags: [db, data]
  - name: Kafka
    kind: broker
    bootstrap_servers: "kafka-1:9092,kafka-2:9092"
    tags: [message, data]
    timeout_ms: 5000
  - name: HttpClient-Proxy
    kind: http
    client: IProxyClient
    method: options
    tags: [http]
  - name: HttpClient-Linx
    kind: http
    client: IPixClient
    path: "payments/healthcheck-id"
    tags: [http]
"#;

    #[test]
    fn test_builds_registry_from_yaml() {
        let config = parse_config(CONFIG, Some("yaml")).unwrap();
        config.validate().unwrap();

        let factory = Arc::new(build_client_factory(&config));
        let registry = build_registry(&config, factory.clone()).unwrap();

        assert_eq!(
            registry.names(),
            vec!["ping", "SqlServer", "Kafka", "HttpClient-Proxy", "HttpClient-Linx"]
        );
        assert_eq!(registry.select(&TagFilter::tag("data")).len(), 2);
        assert_eq!(
            registry.get("Kafka").unwrap().timeout,
            Some(Duration::from_secs(5))
        );
        assert_eq!(registry.get("HttpClient-Proxy").unwrap().probe.kind(), "http");
        assert_eq!(registry.get("SqlServer").unwrap().probe.kind(), "database");
        // Nothing is built until a probe first runs.
        assert_eq!(factory.built_count(), 0);
    }

    #[test]
    fn test_duplicate_probe_names_fail_startup() {
        let yaml = r#"
probes:
  - name: SqlServer
    kind: database
    connection_string: "Server=a"
  - name: SqlServer
    kind: database
    connection_string: "Server=b"
"#;
        let config = parse_config(yaml, Some("yml")).unwrap();
        let err = build_registry(&config, Arc::new(build_client_factory(&config))).unwrap_err();

        assert_eq!(
            err.downcast_ref::<RegistryError>(),
            Some(&RegistryError::DuplicateName("SqlServer".into()))
        );
    }

    #[test]
    fn test_validation_errors() {
        let unknown_client = r#"{"probes": [{"name": "x", "kind": "http", "client": "nope"}]}"#;
        let config = parse_config(unknown_client, Some("json")).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownClient { .. })));

        let zero_default = r#"{"executor": {"default_timeout_ms": 0}}"#;
        let config = parse_config(zero_default, None).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::ZeroDefaultTimeout)));

        let zero_probe = r#"{"probes": [{"name": "ping", "kind": "liveness", "timeout_ms": 0}]}"#;
        let config = parse_config(zero_probe, None).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout(_))));

        let bad_route = r#"{"routes": [{"path": "hc"}]}"#;
        let config = parse_config(bad_route, None).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRoute(_))));

        let bad_endpoint = r#"{"probes": [{"name": "db", "kind": "database", "connection_string": "Database=x"}]}"#;
        let config = parse_config(bad_endpoint, None).unwrap();
        config.validate().unwrap();
        let err = build_registry(&config, Arc::new(build_client_factory(&config))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = parse_config("{}", None).unwrap();
        config.validate().unwrap();

        assert_eq!(config.executor.default_timeout(), Duration::from_secs(30));
        assert_eq!(config.scheduler.interval(), Duration::from_secs(120));
        let paths: Vec<_> = config.routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/hc", "/hc/ping"]);
        assert!(config.probes.is_empty());
    }
}
