use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use hostbridge_core::{
    di::{Injectable, RequireError, Services},
    request::request_services,
    HostBridgeError,
};
use thiserror::Error;

use crate::environment::{PipelineEnvironment, RequestItems};

/// Resolver of the current request.
///
/// Uses the scope in the [PipelineEnvironment], then the one in [RequestItems], then the root.
#[derive(Clone)]
pub struct RequestServices(pub Services);

#[derive(Debug, Error)]
pub enum RequestServicesRejection {
    #[error(transparent)]
    HostBridge(#[from] HostBridgeError),

    #[error(transparent)]
    Require(#[from] RequireError),
}

impl IntoResponse for RequestServicesRejection {
    fn into_response(self) -> Response {
        tracing::error!("Cannot resolve request services: {}", self);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestServices {
    type Rejection = RequestServicesRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestServices(resolve(parts)?))
    }
}

fn resolve(parts: &Parts) -> Result<Services, HostBridgeError> {
    let environment = parts.extensions.get::<PipelineEnvironment>().map(PipelineEnvironment::lock);
    let items = parts.extensions.get::<RequestItems>().map(RequestItems::lock);
    request_services(environment.as_deref(), items.as_deref())
}

/// A required service resolved from [RequestServices]
pub struct Inject<T: ?Sized>(pub Arc<T>);

impl<S, T> FromRequestParts<S> for Inject<T>
where
    S: Send + Sync,
    T: Injectable + ?Sized,
{
    type Rejection = RequestServicesRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequestServices(services) = RequestServices::from_request_parts(parts, state).await?;
        Ok(Inject(services.require::<T>()?))
    }
}
