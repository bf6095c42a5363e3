//! Correlation IDs.
//!
//! Every request gets an `X-Correlation-ID`: taken from the request when it is
//! a valid UUID, generated otherwise. The id is stored in request extensions,
//! recorded on an `http_request` tracing span wrapping the handler, and echoed
//! back on the response, so a buyer's support ticket can be matched to logs.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderValue},
    response::Response,
};
use std::convert::Infallible;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create the correlation ID layer.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(CorrelationId(correlation_id));

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

/// Correlation ID of the current request.
///
/// Reads the id set by [`correlation_id_layer`]; outside the layer a fresh id
/// is generated so handlers never fail on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .copied()
            .unwrap_or_else(|| Self(Uuid::new_v4())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use axum_test::TestServer;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|CorrelationId(id): CorrelationId| async move { id.to_string() }),
            )
            .layer(correlation_id_layer())
    }

    #[tokio::test]
    async fn test_correlation_id_generated_if_missing() {
        let server = TestServer::new(app()).unwrap();

        let response = server.get("/echo").await;

        let header = response.header(CORRELATION_ID_HEADER);
        let id = header.to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        // Handler saw the same id the client got back
        assert_eq!(response.text(), id);
    }

    #[tokio::test]
    async fn test_correlation_id_preserved_from_request() {
        let server = TestServer::new(app()).unwrap();
        let request_id = Uuid::new_v4();

        let response = server
            .get("/echo")
            .add_header(
                CORRELATION_ID_HEADER.parse::<axum::http::HeaderName>().unwrap(),
                HeaderValue::from_str(&request_id.to_string()).unwrap(),
            )
            .await;

        assert_eq!(
            response.header(CORRELATION_ID_HEADER).to_str().unwrap(),
            request_id.to_string()
        );
    }

    #[tokio::test]
    async fn test_invalid_correlation_id_is_replaced() {
        let server = TestServer::new(app()).unwrap();

        let response = server
            .get("/echo")
            .add_header(
                CORRELATION_ID_HEADER.parse::<axum::http::HeaderName>().unwrap(),
                HeaderValue::from_static("not-a-uuid"),
            )
            .await;

        let id = response.header(CORRELATION_ID_HEADER);
        assert_ne!(id.to_str().unwrap(), "not-a-uuid");
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }
}
