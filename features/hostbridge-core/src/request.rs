//! The request-local slot shared by every pipeline adapter.
//!
//! Each adapter keeps per-request values in a [RequestBag] and stores the request's
//! scope under [SCOPE_KEY]. [request_services] resolves through the adapter's own
//! environment bag first, then the request bag, then the root.

use std::{any::Any, collections::HashMap, fmt::Debug};

use hostbridge_di::{Scope, Services};

use crate::{accessor, errors::HostBridgeError};

/// Key of the request scope in a [RequestBag]
pub const SCOPE_KEY: &str = "HostBridge.Scope";

/// String keyed bag of per-request values
#[derive(Default)]
pub struct RequestBag {
    items: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Debug for RequestBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.items.keys()).finish()
    }
}

impl RequestBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.items.insert(key.into(), Box::new(value));
    }

    /// The value under `key`; a value of another type counts as absent
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.items.get(key)?.downcast_ref::<T>()
    }

    /// Removes the value under `key`, returning it if it has type `T`
    pub fn take<T: Any>(&mut self, key: &str) -> Option<T> {
        self.items
            .remove(key)?
            .downcast::<T>()
            .ok()
            .map(|value| *value)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.items.remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The request scope, if one is stored
    pub fn scope(&self) -> Option<&Scope> {
        self.get::<Scope>(SCOPE_KEY)
    }

    pub fn set_scope(&mut self, scope: Scope) {
        self.insert(SCOPE_KEY, scope);
    }
}

/// Resolver for the current request.
///
/// Tries the scope in the pipeline environment, then the one in the request bag, then
/// the root. A slot holding something other than a scope is skipped.
pub fn request_services(
    environment: Option<&RequestBag>,
    items: Option<&RequestBag>,
) -> Result<Services, HostBridgeError> {
    if let Some(scope) = environment.and_then(RequestBag::scope) {
        return Ok(scope.services());
    }
    if let Some(scope) = items.and_then(RequestBag::scope) {
        return Ok(scope.services());
    }
    Ok(Services::Root(accessor::root()?))
}

/// Creates the request scope from the root and stores it in `bag`
pub fn begin_request_scope(bag: &mut RequestBag) -> Result<Scope, HostBridgeError> {
    let scope = accessor::create_scope()?;
    tracing::trace!(scope = scope.id(), "Request scope started");
    bag.set_scope(scope.clone());
    Ok(scope)
}

/// Disposes the request scope stored in `bag` and clears the slot.
///
/// Returns whether a scope was found.
pub fn end_request_scope(bag: &mut RequestBag) -> bool {
    match bag.take::<Scope>(SCOPE_KEY) {
        Some(scope) => {
            tracing::trace!(scope = scope.id(), "Request scope ended");
            scope.dispose();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrongly_typed_slot_counts_as_absent() {
        let mut bag = RequestBag::new();
        bag.insert(SCOPE_KEY, "not a scope");

        assert!(bag.scope().is_none());
        assert!(!end_request_scope(&mut bag));
        assert!(!bag.contains_key(SCOPE_KEY));
    }
}
