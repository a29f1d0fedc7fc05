use std::{
    any::TypeId,
    cell::RefCell,
    collections::HashMap,
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use crate::{
    errors::RequireError,
    factories::ServiceDescriptor,
    resolver::Resolver,
    scope::Scope,
    services::Services,
    types::{Injectable, Instance, Lifetime, TypeInfo},
};

/// The root container: owns every registration and all singleton instances.
///
/// Cloning is cheap, every clone refers to the same root.
#[derive(Clone)]
pub struct DiContainer(Arc<DiContainerInner>);
struct DiContainerInner {
    descriptors: Vec<ServiceDescriptor>,
    by_contract: HashMap<TypeId, Vec<usize>>,
    /// One slot per descriptor - only used by singletons
    singletons: Vec<Mutex<Option<Instance>>>,
    /// Disposable instances owned by the root, in creation order
    owned: Mutex<Vec<Owned>>,
    disposed: AtomicBool,
}

/// A disposable instance and the registration it was created from
pub(crate) struct Owned {
    pub(crate) index: usize,
    pub(crate) instance: Instance,
}

impl Debug for DiContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("DiContainer");
        for descriptor in &self.0.descriptors {
            map.field(descriptor.info.type_name, &descriptor.lifetime);
        }
        map.finish()
    }
}

impl DiContainer {
    pub(crate) fn new(descriptors: Vec<ServiceDescriptor>) -> Self {
        let mut by_contract: HashMap<TypeId, Vec<usize>> = HashMap::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            by_contract
                .entry(descriptor.info.type_id)
                .or_default()
                .push(index);
        }
        let singletons = descriptors.iter().map(|_| Mutex::new(None)).collect();

        Self(Arc::new(DiContainerInner {
            descriptors,
            by_contract,
            singletons,
            owned: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }))
    }

    /// Resolver view of the root
    pub fn services(&self) -> Services {
        Services::Root(self.clone())
    }

    /// Attempts to get the requested contract
    pub fn require<T: Injectable + ?Sized>(&self) -> Result<Arc<T>, RequireError> {
        self.services().require()
    }

    /// Gets the requested contract, `None` if it is not registered
    pub fn get<T: Injectable + ?Sized>(&self) -> Result<Option<Arc<T>>, RequireError> {
        self.services().get()
    }

    /// All registrations of a contract, in registration order
    pub fn require_all<T: Injectable + ?Sized>(&self) -> Result<Vec<Arc<T>>, RequireError> {
        self.services().require_all()
    }

    pub fn resolve<R: Resolver>(&self) -> Result<R, RequireError> {
        R::resolve(&self.services())
    }

    /// Creates a child scope - the caller owns its disposal
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    pub fn is_registered<T: Injectable + ?Sized>(&self) -> bool {
        self.0.by_contract.contains_key(&TypeId::of::<T>())
    }

    /// Contracts and lifetimes, in registration order
    pub fn registrations(&self) -> impl Iterator<Item = (TypeInfo, Lifetime)> + '_ {
        self.0
            .descriptors
            .iter()
            .map(|descriptor| (descriptor.info, descriptor.lifetime))
    }

    /// True if both handles refer to the same root
    pub fn ptr_eq(&self, other: &DiContainer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.load(Ordering::Acquire)
    }

    /// Disposes all disposable instances owned by the root, newest first.
    ///
    /// Only the first call has an effect.
    pub fn dispose(&self) {
        if self.0.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let owned = std::mem::take(&mut *lock(&self.0.owned));
        tracing::debug!("Disposing root container ({} owned instances)", owned.len());
        self.dispose_owned(owned);

        for slot in &self.0.singletons {
            lock(slot).take();
        }
    }
}

// Resolution internals shared with scopes
impl DiContainer {
    pub(crate) fn indices(&self, type_id: TypeId) -> Option<&[usize]> {
        self.0.by_contract.get(&type_id).map(Vec::as_slice)
    }

    pub(crate) fn resolve_index(
        &self,
        index: usize,
        scope: Option<&Scope>,
    ) -> Result<Instance, RequireError> {
        let descriptor = &self.0.descriptors[index];
        let type_name = descriptor.info.type_name;

        if self.is_disposed() {
            return Err(RequireError::ContainerDisposed(type_name));
        }
        // Must be entered before the singleton slot is locked
        let _resolving = Resolving::enter(self.key(index), type_name)?;

        match descriptor.lifetime {
            Lifetime::Singleton => {
                // Holding the slot lock while constructing makes creation happen once
                let mut slot = lock(&self.0.singletons[index]);
                if let Some(instance) = slot.as_ref() {
                    return Ok(instance.clone());
                }

                let instance = self.construct(index, &self.services())?;
                *slot = Some(instance.clone());
                drop(slot);

                tracing::debug!("Constructed singleton {}", type_name);
                if descriptor.disposer.is_some() {
                    self.own(index, instance.clone());
                }
                Ok(instance)
            }
            Lifetime::Scoped => match scope {
                Some(scope) => scope.resolve_scoped(index),
                None => Err(RequireError::ScopedFromRoot(type_name)),
            },
            Lifetime::Transient => {
                let services = match scope {
                    Some(scope) => Services::Scope(scope.clone()),
                    None => self.services(),
                };
                let instance = self.construct(index, &services)?;

                if descriptor.disposer.is_some() {
                    match scope {
                        Some(scope) => scope.own(index, instance.clone()),
                        None => self.own(index, instance.clone()),
                    }
                }
                Ok(instance)
            }
        }
    }

    pub(crate) fn construct(
        &self,
        index: usize,
        services: &Services,
    ) -> Result<Instance, RequireError> {
        let descriptor = &self.0.descriptors[index];
        (descriptor.factory)(services).map_err(|error| {
            tracing::error!("Factory for {} failed: {}", descriptor.info.type_name, error);
            RequireError::FactoryFailed {
                product: descriptor.info.type_name,
                error: Arc::new(error),
            }
        })
    }

    pub(crate) fn has_disposer(&self, index: usize) -> bool {
        self.0.descriptors[index].disposer.is_some()
    }

    /// Runs the disposers of the given instances, newest first
    pub(crate) fn dispose_owned(&self, owned: Vec<Owned>) {
        for Owned { index, instance } in owned.into_iter().rev() {
            if let Some(disposer) = &self.0.descriptors[index].disposer {
                disposer(&instance);
            }
        }
    }

    fn own(&self, index: usize, instance: Instance) {
        lock(&self.0.owned).push(Owned { index, instance });
    }

    fn key(&self, index: usize) -> (usize, usize) {
        (Arc::as_ptr(&self.0) as usize, index)
    }
}

thread_local! {
    /// (root, registration) pairs under construction on this thread, innermost last
    static RESOLVING: RefCell<Vec<(usize, usize)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a registration as being resolved until dropped.
///
/// Factories run synchronously on the resolving thread, so meeting the same
/// registration again in the chain is a cycle.
struct Resolving((usize, usize));

impl Resolving {
    fn enter(key: (usize, usize), type_name: &'static str) -> Result<Self, RequireError> {
        RESOLVING.with(|chain| {
            let mut chain = chain.borrow_mut();
            if chain.contains(&key) {
                tracing::error!("Circular dependency while resolving {}", type_name);
                return Err(RequireError::CircularDependency(type_name));
            }
            chain.push(key);
            Ok(Resolving(key))
        })
    }
}

impl Drop for Resolving {
    fn drop(&mut self) {
        let _ = RESOLVING.try_with(|chain| {
            let mut chain = chain.borrow_mut();
            if let Some(position) = chain.iter().rposition(|key| *key == self.0) {
                chain.remove(position);
            }
        });
    }
}

/// The guarded data stays consistent even if a factory panicked while the lock was held
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
