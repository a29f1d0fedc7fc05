use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::http::Extensions;
use hostbridge_core::request::RequestBag;

/// The environment dictionary shared by the middleware of one request.
///
/// Lives in the request extensions; clones share the same bag.
#[derive(Clone, Default)]
pub struct PipelineEnvironment(Arc<Mutex<RequestBag>>);

impl PipelineEnvironment {
    pub fn lock(&self) -> MutexGuard<'_, RequestBag> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The environment of the request, created on first use
    pub fn of(extensions: &mut Extensions) -> PipelineEnvironment {
        if let Some(environment) = extensions.get::<PipelineEnvironment>() {
            return environment.clone();
        }
        let environment = PipelineEnvironment::default();
        extensions.insert(environment.clone());
        environment
    }
}

/// Request items set up by an outer pipeline, consulted after the environment
#[derive(Clone, Default)]
pub struct RequestItems(Arc<Mutex<RequestBag>>);

impl RequestItems {
    pub fn new(bag: RequestBag) -> Self {
        RequestItems(Arc::new(Mutex::new(bag)))
    }

    pub fn lock(&self) -> MutexGuard<'_, RequestBag> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
