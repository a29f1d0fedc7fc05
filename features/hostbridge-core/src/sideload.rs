//! Service location for code that cannot take dependencies through its constructor.

use std::{future::Future, sync::Arc};

use hostbridge_di::{Injectable, Services};

use crate::{accessor, errors::HostBridgeError};

/// Resolves from the ambient scope, or the root when none is active
pub fn required<T: Injectable + ?Sized>() -> Result<Arc<T>, HostBridgeError> {
    accessor::get::<T>()
}

pub fn optional<T: Injectable + ?Sized>() -> Result<Option<Arc<T>>, HostBridgeError> {
    accessor::try_get::<T>()
}

/// Resolves from the root, ignoring any ambient scope
pub fn singleton<T: Injectable + ?Sized>() -> Result<Arc<T>, HostBridgeError> {
    Ok(accessor::root()?.require::<T>()?)
}

/// Runs `work` inside a fresh ambient scope which is disposed afterwards
pub fn in_scope<R>(work: impl FnOnce(&Services) -> R) -> Result<R, HostBridgeError> {
    let ambient = accessor::begin_ambient_scope()?;
    let output = work(&ambient.services());
    ambient.dispose();
    Ok(output)
}

/// Async variant of [in_scope]: the scope is ambient for the whole future
pub async fn in_scope_async<F, Fut>(work: F) -> Result<Fut::Output, HostBridgeError>
where
    F: FnOnce(Services) -> Fut,
    Fut: Future,
{
    let scope = accessor::create_scope()?;
    let output = accessor::with_scope(&scope, work(scope.services())).await;
    scope.dispose();
    Ok(output)
}
