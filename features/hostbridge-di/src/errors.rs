use std::sync::Arc;

use thiserror::Error;

use crate::types::DynError;

/// Errors when trying to require a certain type
#[derive(Error, Debug, Clone)]
pub enum RequireError {
    /// The required type is not registered
    #[error("No service is registered for '{0}'")]
    TypeMissing(&'static str),

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },

    /// A Factory failed to build
    #[error("Factory for '{product}' failed - error: {error}")]
    FactoryFailed {
        product: &'static str,
        error: Arc<DynError>,
    },

    /// Scoped services only live inside a scope
    #[error("Scoped service '{0}' cannot be resolved from the root container")]
    ScopedFromRoot(&'static str),

    #[error("Cannot resolve '{0}' from a disposed scope")]
    ScopeDisposed(&'static str),

    #[error("Cannot resolve '{0}' from a disposed container")]
    ContainerDisposed(&'static str),

    /// Resolving the contract required itself again
    #[error("Circular dependency detected while resolving '{0}'")]
    CircularDependency(&'static str),
}

impl RequireError {
    /// True if the error only means "nothing is registered"
    pub fn is_missing(&self) -> bool {
        matches!(self, RequireError::TypeMissing(_))
    }

    /// True if the error, or a factory failure it wraps, is a dependency cycle
    pub fn is_circular(&self) -> bool {
        match self {
            RequireError::CircularDependency(_) => true,
            RequireError::FactoryFailed { error, .. } => (**error)
                .downcast_ref::<RequireError>()
                .is_some_and(RequireError::is_circular),
            _ => false,
        }
    }
}
