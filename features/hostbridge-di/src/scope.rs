use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use crate::{
    container::{lock, DiContainer, Owned},
    errors::RequireError,
    resolver::Resolver,
    services::Services,
    types::{Injectable, Instance},
};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// A child of the root container owning scoped instances.
///
/// Clones share the same scope. Disposal happens once, either explicitly through
/// [Scope::dispose] or when the last clone is dropped.
#[derive(Clone)]
pub struct Scope(Arc<ScopeInner>);
struct ScopeInner {
    id: u64,
    root: DiContainer,
    /// Scoped instances keyed by registration index
    instances: Mutex<HashMap<usize, Instance>>,
    /// Disposable instances owned by this scope, in creation order
    owned: Mutex<Vec<Owned>>,
    disposed: AtomicBool,
}

impl Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.0.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Scope {
    pub(crate) fn new(root: DiContainer) -> Self {
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(scope = id, "Created scope");
        Scope(Arc::new(ScopeInner {
            id,
            root,
            instances: Mutex::new(HashMap::new()),
            owned: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }))
    }

    /// Process-unique id of the scope
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn root(&self) -> &DiContainer {
        &self.0.root
    }

    /// Resolver view of this scope
    pub fn services(&self) -> Services {
        Services::Scope(self.clone())
    }

    pub fn require<T: Injectable + ?Sized>(&self) -> Result<Arc<T>, RequireError> {
        self.services().require()
    }

    pub fn get<T: Injectable + ?Sized>(&self) -> Result<Option<Arc<T>>, RequireError> {
        self.services().get()
    }

    pub fn require_all<T: Injectable + ?Sized>(&self) -> Result<Vec<Arc<T>>, RequireError> {
        self.services().require_all()
    }

    pub fn resolve<R: Resolver>(&self) -> Result<R, RequireError> {
        R::resolve(&self.services())
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.load(Ordering::Acquire)
    }

    /// Disposes all instances owned by the scope, newest first.
    ///
    /// Only the first call has an effect.
    pub fn dispose(&self) {
        self.0.dispose();
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn resolve_scoped(&self, index: usize) -> Result<Instance, RequireError> {
        if let Some(instance) = lock(&self.0.instances).get(&index) {
            return Ok(instance.clone());
        }

        // Construct without holding the lock, the factory may resolve other scoped services
        let instance = self.0.root.construct(index, &self.services())?;

        let mut instances = lock(&self.0.instances);
        if let Some(existing) = instances.get(&index) {
            // Lost a race within the same scope - keep the first instance
            let existing = existing.clone();
            drop(instances);
            self.0.root.dispose_owned(vec![Owned { index, instance }]);
            return Ok(existing);
        }
        instances.insert(index, instance.clone());
        drop(instances);

        if self.0.root.has_disposer(index) {
            self.own(index, instance.clone());
        }
        Ok(instance)
    }

    pub(crate) fn own(&self, index: usize, instance: Instance) {
        lock(&self.0.owned).push(Owned { index, instance });
    }
}

impl ScopeInner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let owned = std::mem::take(&mut *lock(&self.owned));
        lock(&self.instances).clear();
        self.root.dispose_owned(owned);
        tracing::trace!(scope = self.id, "Disposed scope");
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.dispose();
    }
}
