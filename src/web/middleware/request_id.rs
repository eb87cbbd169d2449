//! Per-request tracing spans with request IDs.
//!
//! Reuses an incoming `X-Request-Id` header when a proxy already assigned
//! one, otherwise generates a ULID. The resolved ID is echoed back in the
//! `X-Request-Id` response header.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;

static REQUEST_ID: &str = "x-request-id";

/// Longest incoming ID accepted as-is.
const MAX_INCOMING_LEN: usize = 64;

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

fn resolve_request_id(req: &Request) -> String {
    req.headers()
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= MAX_INCOMING_LEN)
        .map(String::from)
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let req_id = resolve_request_id(&req);
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let span = tracing::info_span!("request", req_id = %req_id);
        let header_value = HeaderValue::from_str(&req_id).ok();
        let start = Instant::now();

        let future = self.inner.call(req);

        Box::pin(
            async move {
                let mut result = future.await;
                let duration_ms = start.elapsed().as_millis() as u64;

                match &result {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        match status {
                            200..=399 => {
                                tracing::debug!(%method, %path, status, duration_ms, "response");
                            }
                            400..=499 => {
                                tracing::info!(%method, %path, status, duration_ms, "response");
                            }
                            _ => {
                                tracing::warn!(%method, %path, status, duration_ms, "response");
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(%method, %path, error = ?e, duration_ms, "request failed");
                    }
                }

                if let Ok(ref mut response) = result
                    && let Some(value) = header_value
                {
                    response.headers_mut().insert(REQUEST_ID, value);
                }

                result
            }
            .instrument(span),
        )
    }
}
