use std::task::{Context, Poll};

use axum::{extract::Request, response::Response};
use futures::future::BoxFuture;
use hostbridge_core::correlation::{Correlation, CORRELATION_HEADER};
use tower::{Layer, Service};

/// Correlates every request by its correlation header, or a new id.
///
/// The id flows with the request future and the future runs in the `correlation` span.
#[derive(Debug, Clone)]
pub struct CorrelationLayer {
    header_name: String,
}

impl Default for CorrelationLayer {
    fn default() -> Self {
        CorrelationLayer::new(CORRELATION_HEADER)
    }
}

impl CorrelationLayer {
    pub fn new(header_name: impl Into<String>) -> Self {
        CorrelationLayer {
            header_name: header_name.into(),
        }
    }
}

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationMiddleware {
            inner,
            header_name: self.header_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationMiddleware<S> {
    inner: S,
    header_name: String,
}

impl<S> Service<Request> for CorrelationMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let incoming = request
            .headers()
            .get(self.header_name.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let response = self.inner.call(request);
        Box::pin(Correlation::scope(
            incoming.as_deref(),
            &self.header_name,
            response,
        ))
    }
}
