// ────────────────────────────────
// src/server/builder.rs
// ────────────────────────────────
use crate::server::listener::bind_tcp;
use anyhow::{anyhow, Result};
use hyper::{server::conn::Http, Body, Request, Response};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::Service;

/// Builder so `main.rs` can inject the report handler and a shutdown signal.
pub struct ServerBuilder<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    addr: SocketAddr,
    handler: Option<H>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<H> ServerBuilder<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            handler: None,
            shutdown: None,
        }
    }

    pub fn with_handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Stop accepting connections once `true` is sent.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Consume the builder, bind the TCP listener and serve until shutdown.
    pub async fn serve(self) -> Result<()> {
        let listener = bind_tcp(self.addr).await?;
        self.serve_on(listener).await
    }

    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        let handler = self
            .handler
            .ok_or_else(|| anyhow!("handler must be set via with_handler()"))?;
        let mut shutdown = self.shutdown;
        tracing::info!("HTTP server listening on {}", listener.local_addr()?);

        loop {
            let accepted = match shutdown.as_mut() {
                Some(rx) => tokio::select! {
                    accepted = listener.accept() => accepted,
                    _ = rx.changed() => {
                        tracing::info!("HTTP server shutting down");
                        return Ok(());
                    }
                },
                None => listener.accept().await,
            };
            let (stream, peer) = accepted?;
            let svc = handler.clone();

            // One Tokio task per connection.
            tokio::spawn(async move {
                let http = Http::new();
                if let Err(err) = http.serve_connection(stream, svc).await {
                    tracing::warn!(%peer, %err, "connection error");
                }
            });
        }
    }
}
