//! Process-wide access to the root container and the ambient scope.
//!
//! [initialize] records the root once. Request pipelines then install a child
//! scope as ambient for the duration of a unit of work ([begin_ambient_scope] for
//! synchronous code, [in_ambient_scope] for futures) and [current] resolves from it,
//! falling back to the root when no scope is active.

use std::{
    cell::RefCell,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};

use hostbridge_di::{DiContainer, Injectable, RequireError, Scope, Services};

use crate::{
    errors::HostBridgeError,
    flow::{FlowingCell, Restore},
    host::Host,
};

pub(crate) const NOT_INITIALIZED: &str =
    "HostBridge is not initialized. Call accessor::initialize(&host) after build()";

static ROOT: RwLock<Option<DiContainer>> = RwLock::new(None);

tokio::task_local! {
    static AMBIENT_TASK: RefCell<Option<Scope>>;
}
thread_local! {
    static AMBIENT_THREAD: RefCell<Option<Scope>> = const { RefCell::new(None) };
}
static AMBIENT: FlowingCell<Scope> = FlowingCell::new(&AMBIENT_TASK, &AMBIENT_THREAD);

/// Records the host's container as the process root.
///
/// Initializing again with the same container is a no-op, a different one is rejected.
pub fn initialize(host: &dyn Host) -> Result<(), HostBridgeError> {
    let root = host.services().ok_or(HostBridgeError::NullContainer)?;
    initialize_container(&root)
}

pub fn initialize_container(root: &DiContainer) -> Result<(), HostBridgeError> {
    let mut slot = ROOT.write().unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
        Some(existing) if existing.ptr_eq(root) => Ok(()),
        Some(_) => Err(HostBridgeError::AlreadyInitialized),
        None => {
            tracing::debug!("Root container initialized");
            *slot = Some(root.clone());
            Ok(())
        }
    }
}

pub fn is_initialized() -> bool {
    ROOT.read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// The root container
pub fn root() -> Result<DiContainer, HostBridgeError> {
    ROOT.read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(HostBridgeError::NotInitialized(NOT_INITIALIZED))
}

/// The ambient scope if one is active for this call context, else the root
pub fn current() -> Result<Services, HostBridgeError> {
    match AMBIENT.get() {
        Some(scope) => Ok(Services::Scope(scope)),
        None => root().map(Services::Root),
    }
}

/// The ambient scope of this call context, if any
pub fn ambient_scope() -> Option<Scope> {
    AMBIENT.get()
}

/// A new child scope of the root, the caller owns its disposal
pub fn create_scope() -> Result<Scope, HostBridgeError> {
    Ok(root()?.create_scope())
}

/// Creates a child scope and makes it ambient until the guard is disposed
pub fn begin_ambient_scope() -> Result<AmbientScope, HostBridgeError> {
    let scope = create_scope()?;
    let restore = AMBIENT.enter(Some(scope.clone()));
    Ok(AmbientScope { scope, restore })
}

/// Makes an existing scope ambient without taking ownership of it
pub fn enter_scope(scope: &Scope) -> Restore<Scope> {
    AMBIENT.enter(Some(scope.clone()))
}

/// Runs `fut` with a fresh child scope as ambient and disposes the scope afterwards
pub async fn in_ambient_scope<F: Future>(fut: F) -> Result<F::Output, HostBridgeError> {
    let scope = create_scope()?;
    let output = AMBIENT.flow_with(Some(scope.clone()), fut).await;
    scope.dispose();
    Ok(output)
}

/// Runs `fut` with `scope` as ambient; the scope stays owned by the caller
pub fn with_scope<F: Future>(scope: &Scope, fut: F) -> impl Future<Output = F::Output> {
    AMBIENT.flow_with(Some(scope.clone()), fut)
}

/// Carries the current ambient scope into `fut`, e.g. before spawning it
pub fn flow<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    AMBIENT.flow(fut)
}

/// Resolves a required service from [current]
pub fn get<T: Injectable + ?Sized>() -> Result<Arc<T>, HostBridgeError> {
    Ok(current()?.require::<T>()?)
}

/// Resolves a service from [current], `None` if it is not registered
pub fn try_get<T: Injectable + ?Sized>() -> Result<Option<Arc<T>>, HostBridgeError> {
    match current()?.get::<T>() {
        Ok(service) => Ok(service),
        Err(RequireError::TypeMissing(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Forgets the root and clears the ambient scope of the calling thread
#[cfg(any(test, feature = "test-util"))]
pub fn reset_for_tests() {
    *ROOT.write().unwrap_or_else(PoisonError::into_inner) = None;
    AMBIENT.replace(None);
}

/// Guard for an ambient child scope.
///
/// Disposing it disposes the scope and restores the previously ambient scope, once.
pub struct AmbientScope {
    scope: Scope,
    restore: Restore<Scope>,
}

impl AmbientScope {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn services(&self) -> Services {
        self.scope.services()
    }

    pub fn dispose(&self) {
        if self.restore.is_restored() {
            return;
        }
        self.scope.dispose();
        self.restore.restore();
    }
}

impl Drop for AmbientScope {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use hostbridge_di::ServiceRegistry;
    use serial_test::serial;

    use super::*;

    struct Counter;

    fn container() -> DiContainer {
        let mut registry = ServiceRegistry::new();
        registry
            .add_singleton(|_| Ok(Arc::new(Counter)))
            .add_scoped(|_| Ok(Arc::new(String::from("scoped"))));
        registry.build()
    }

    #[test]
    #[serial]
    fn root_before_initialize_is_not_initialized() {
        reset_for_tests();
        assert!(matches!(root(), Err(HostBridgeError::NotInitialized(_))));
        assert!(matches!(current(), Err(HostBridgeError::NotInitialized(_))));
        assert!(matches!(
            begin_ambient_scope(),
            Err(HostBridgeError::NotInitialized(_))
        ));
    }

    #[test]
    #[serial]
    fn initialize_is_idempotent_for_the_same_container_only() {
        reset_for_tests();
        let first = container();
        initialize_container(&first).unwrap();
        initialize_container(&first.clone()).unwrap();

        let err = initialize_container(&container()).unwrap_err();
        assert!(matches!(err, HostBridgeError::AlreadyInitialized));
        assert!(root().unwrap().ptr_eq(&first));
    }

    #[test]
    #[serial]
    fn ambient_scope_round_trips() {
        reset_for_tests();
        initialize_container(&container()).unwrap();

        assert!(matches!(current().unwrap(), Services::Root(_)));
        let outer = begin_ambient_scope().unwrap();
        let outer_value = get::<String>().unwrap();
        {
            let inner = begin_ambient_scope().unwrap();
            assert!(current().unwrap().same_provider(&inner.services()));
            assert!(!Arc::ptr_eq(&get::<String>().unwrap(), &outer_value));
            inner.dispose();
            inner.dispose();
            assert!(inner.scope().is_disposed());
        }
        assert!(current().unwrap().same_provider(&outer.services()));
        assert!(Arc::ptr_eq(&get::<String>().unwrap(), &outer_value));

        drop(outer);
        assert!(ambient_scope().is_none());
        assert!(try_get::<String>().is_err());
    }

    #[test]
    #[serial]
    fn try_get_maps_missing_to_none() {
        reset_for_tests();
        initialize_container(&container()).unwrap();
        struct Unregistered;
        assert!(try_get::<Unregistered>().unwrap().is_none());
        assert!(try_get::<Counter>().unwrap().is_some());
    }
}
