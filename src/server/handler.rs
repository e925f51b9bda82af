// src/server/handler.rs
use crate::registry::TagFilter;
use crate::scheduler::ReportScheduler;
use crate::server::response::{report_response, text_response};
use crate::service::{HealthService, ReportRequest};
use hyper::{Body, Method, Request, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::Service;

/// Serves the scheduler's most recent full report.
pub const LATEST_PATH: &str = "/hc/latest";

/// An exposure path and the probes it reports on.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub filter: TagFilter,
}

impl Route {
    pub fn new(path: impl Into<String>, filter: TagFilter) -> Self {
        Self {
            path: path.into(),
            filter,
        }
    }
}

#[derive(Clone)]
pub struct RequestHandler {
    service: Arc<HealthService>,
    routes: Arc<Vec<Route>>,
    scheduler: Option<Arc<ReportScheduler>>,
}

impl RequestHandler {
    pub fn new(service: Arc<HealthService>, routes: Vec<Route>) -> Self {
        Self {
            service,
            routes: Arc::new(routes),
            scheduler: None,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<ReportScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, hyper::http::Error> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        let path = req.uri().path();

        if path == LATEST_PATH {
            if let Some(scheduler) = &self.scheduler {
                return match scheduler.latest() {
                    Some(report) => report_response(&report),
                    None => text_response(StatusCode::SERVICE_UNAVAILABLE, ""),
                };
            }
        }

        let Some(route) = self.routes.iter().find(|r| r.path == path) else {
            return text_response(StatusCode::NOT_FOUND, "Not Found");
        };

        let timeout = match requested_timeout(req.uri().query()) {
            Ok(timeout) => timeout,
            Err(message) => return text_response(StatusCode::BAD_REQUEST, &message),
        };

        let mut request = ReportRequest::filtered(route.filter.clone());
        if let Some(timeout) = timeout {
            request = request.with_timeout(timeout);
        }

        let report = self.service.report(request).await;
        report_response(&report)
    }
}

/// `?timeout=<ms>` bounds the run for this request only.
fn requested_timeout(query: Option<&str>) -> Result<Option<Duration>, String> {
    let Some(query) = query else {
        return Ok(None);
    };

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key == "timeout" {
            return value
                .parse::<u64>()
                .map(|ms| Some(Duration::from_millis(ms)))
                .map_err(|_| format!("invalid timeout '{}'", value));
        }
    }
    Ok(None)
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Box<dyn std::error::Error + Send + Sync>;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move {
            handler.handle(req).await.map_err(|e| {
                tracing::error!(%e, "failed to build response");
                Box::new(e) as Box<dyn std::error::Error + Send + Sync>
            })
        })
    }
}
