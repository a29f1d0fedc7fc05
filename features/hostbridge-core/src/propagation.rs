//! Stamps the current correlation id onto outbound HTTP requests.

use std::task::{Context, Poll};

use http::{header::InvalidHeaderName, HeaderMap, HeaderName, HeaderValue, Request};
use tower::{Layer, Service};

use crate::correlation::{correlation_id, CORRELATION_HEADER};

/// Adds the current correlation id under `header_name`.
///
/// Nothing is added when no correlation is active or the header is already present.
/// Returns whether the header was added.
pub fn stamp_correlation(headers: &mut HeaderMap, header_name: &HeaderName) -> bool {
    if headers.contains_key(header_name) {
        return false;
    }
    let Some(id) = correlation_id() else {
        return false;
    };
    match HeaderValue::from_str(&id) {
        Ok(value) => {
            headers.insert(header_name.clone(), value);
            true
        }
        Err(_) => {
            tracing::debug!("Correlation id '{}' is not a valid header value", id);
            false
        }
    }
}

/// Applies [stamp_correlation] to every request passing through the wrapped service
#[derive(Debug, Clone)]
pub struct CorrelationPropagationLayer {
    header_name: HeaderName,
}

impl Default for CorrelationPropagationLayer {
    fn default() -> Self {
        CorrelationPropagationLayer {
            header_name: HeaderName::from_static("x-correlation-id"),
        }
    }
}

impl CorrelationPropagationLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(header_name: &str) -> Result<Self, InvalidHeaderName> {
        Ok(CorrelationPropagationLayer {
            header_name: HeaderName::from_bytes(header_name.as_bytes())?,
        })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }
}

impl<S> Layer<S> for CorrelationPropagationLayer {
    type Service = CorrelationPropagation<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationPropagation {
            inner,
            header_name: self.header_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationPropagation<S> {
    inner: S,
    header_name: HeaderName,
}

impl<S, B> Service<Request<B>> for CorrelationPropagation<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        stamp_correlation(request.headers_mut(), &self.header_name);
        self.inner.call(request)
    }
}
