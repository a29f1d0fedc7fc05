use std::task::{Context, Poll};

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use hostbridge_core::{
    accessor,
    request::{begin_request_scope, end_request_scope},
};
use tower::{Layer, Service};

use crate::environment::PipelineEnvironment;

/// Gives every request its own DI scope.
///
/// The scope is published in the [PipelineEnvironment], ambient while the inner service runs,
/// and disposed when the response is ready or the request is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestScopeLayer;

impl<S> Layer<S> for RequestScopeLayer {
    type Service = RequestScopeMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestScopeMiddleware { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestScopeMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for RequestScopeMiddleware<S>
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

    fn call(&mut self, mut request: Request) -> Self::Future {
        let environment = PipelineEnvironment::of(request.extensions_mut());
        let scope = match begin_request_scope(&mut environment.lock()) {
            Ok(scope) => scope,
            Err(e) => {
                tracing::error!("Cannot create the request scope: {}", e);
                return Box::pin(async { Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response()) });
            }
        };

        let end = EndScope(environment);
        let response = accessor::with_scope(&scope, self.inner.call(request));
        Box::pin(async move {
            let response = response.await;
            drop(end);
            response
        })
    }
}

/// Clears the slot and disposes the scope, also when the request future is dropped
struct EndScope(PipelineEnvironment);

impl Drop for EndScope {
    fn drop(&mut self) {
        end_request_scope(&mut self.0.lock());
    }
}
