//! HTTP observability middleware
//!
//! Tower Layer/Service that tags each request with an ID, records request
//! metrics and echoes the ID back in `x-request-id`.

use axum::{body::Body, http::Request, response::Response};
use metrics::{counter, gauge, histogram};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct ObservabilityLayer;

impl<S> Layer<S> for ObservabilityLayer {
    type Service = ObservabilityMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ObservabilityMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct ObservabilityMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for ObservabilityMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let method = request.method().to_string();
        let route = route_label(request.uri().path());
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        gauge!("plangate_http_requests_in_flight").increment(1.0);
        let started = Instant::now();
        let span = tracing::info_span!("request", request_id = %request_id, method = %method);

        // Take the service that was driven to readiness, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(
            async move {
                let result = inner.call(request).await;
                gauge!("plangate_http_requests_in_flight").decrement(1.0);
                let mut response = result?;

                let status = response.status().as_u16().to_string();
                counter!(
                    "plangate_http_requests_total",
                    "method" => method.clone(),
                    "path" => route.clone(),
                    "status" => status
                )
                .increment(1);
                histogram!(
                    "plangate_http_request_duration_seconds",
                    "method" => method,
                    "path" => route
                )
                .record(started.elapsed().as_secs_f64());

                if let Ok(value) = request_id.parse() {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Metric label for a request path: ids collapse to `{id}` and the action
/// slug of a check collapses to `{slug}`, keeping label cardinality bounded.
fn route_label(path: &str) -> String {
    let mut previous = "";
    path.split('/')
        .map(|segment| {
            let label = if looks_like_uuid(segment) {
                "{id}"
            } else if previous == "check" && !segment.is_empty() {
                "{slug}"
            } else {
                segment
            };
            previous = segment;
            label
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn looks_like_uuid(s: &str) -> bool {
    s.len() == 36 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}
