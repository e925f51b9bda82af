// src/main.rs
use anyhow::Result;
use hyper::{Body, Request, Response, Server, StatusCode};
use rust_health_checks::{
    config::{self, Config},
    executor::Executor,
    metrics::MetricsRegistry,
    scheduler::ReportScheduler,
    server::{RequestHandler, Route, ServerBuilder},
    service::HealthService,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rust_health_checks=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();
    
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    
    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;
    
    // Build probes; a duplicate name stops startup here
    let factory = Arc::new(config::build_client_factory(&config));
    let registry = Arc::new(config::build_registry(&config, factory)?);
    info!("Registered {} probes", registry.len());
    
    // Initialize metrics
    let metrics_registry = MetricsRegistry::new()?;
    let metrics = metrics_registry.collector();
    
    let executor = Executor::new(config.executor.default_timeout()).with_metrics(metrics);
    let mut service = HealthService::new(registry, executor);
    if let Some(deadline) = config.executor.run_deadline() {
        service = service.with_run_deadline(deadline);
    }
    let service = Arc::new(service);
    
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    
    // Start metrics server if enabled
    if config.metrics.enabled {
        let metrics_addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        start_metrics_server(metrics_addr, metrics_registry, config.metrics.path.clone()).await?;
    }
    
    let mut handler = RequestHandler::new(service.clone(), routes(&config));
    
    // Start scheduler
    let scheduler = if config.scheduler.enabled {
        let scheduler = Arc::new(ReportScheduler::new(
            service.clone(),
            config.scheduler.interval(),
            config.scheduler.jitter_pct,
        ));
        tokio::spawn(scheduler.clone().start());
        handler = handler.with_scheduler(scheduler.clone());
        Some(scheduler)
    } else {
        None
    };
    
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });
    
    info!("Starting health check server on {}", config.server.listen);
    
    ServerBuilder::new(config.server.listen)
        .with_handler(handler)
        .with_shutdown(shutdown_rx)
        .serve()
        .await?;
    
    if let Some(scheduler) = scheduler {
        scheduler.shutdown();
    }
    
    Ok(())
}

fn routes(config: &Config) -> Vec<Route> {
    config
        .routes
        .iter()
        .map(|route| Route::new(route.path.clone(), route.filter()))
        .collect()
}

async fn start_metrics_server(
    addr: SocketAddr,
    registry: MetricsRegistry,
    path: String,
) -> Result<()> {
    let registry = Arc::new(registry);
    let metrics_path = Arc::new(path); // keep this for logging
    let service_path = metrics_path.clone(); // clone for the service closure

    let make_service = hyper::service::make_service_fn(move |_| {
        let registry = registry.clone();
        let path = service_path.clone();

        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let path = path.clone();

                async move {
                    if req.uri().path() == path.as_str() {
                        Response::builder()
                            .status(StatusCode::OK)
                            .header("Content-Type", "text/plain; version=0.0.4")
                            .body(Body::from(registry.gather()))
                    } else {
                        Response::builder()
                            .status(StatusCode::NOT_FOUND)
                            .body(Body::from("Not Found"))
                    }
                }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_service);

    info!(
        "Metrics server listening on http://{}{}",
        addr,
        metrics_path.as_str()
    );

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };
    
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    
    info!("Shutdown signal received");
}
