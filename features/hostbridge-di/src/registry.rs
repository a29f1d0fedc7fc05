use std::{any::TypeId, sync::Arc};

use crate::{
    container::DiContainer,
    factories::{InstanceFactory, ServiceDescriptor},
    services::Services,
    types::{Dispose, DynError, Injectable, Lifetime},
};

/// Collects service registrations before the root container is built.
///
/// Registering the same contract twice keeps both registrations: single resolution
/// returns the last one, `require_all` returns all of them in registration order.
#[derive(Default)]
pub struct ServiceRegistry {
    pub(crate) descriptors: Vec<ServiceDescriptor>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        ServiceRegistry {
            descriptors: Vec::new(),
        }
    }

    /// Registers a factory with an explicit lifetime
    pub fn add_factory<Factory: InstanceFactory>(
        &mut self,
        lifetime: Lifetime,
        factory: Factory,
    ) -> &mut Self {
        self.descriptors
            .push(ServiceDescriptor::new(lifetime, factory));
        self
    }

    /// Registers a factory closure with an explicit lifetime
    pub fn add_fn<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Injectable + ?Sized,
        F: Fn(&Services) -> Result<Arc<T>, DynError> + Send + Sync + 'static,
    {
        self.descriptors
            .push(ServiceDescriptor::from_fn(lifetime, factory));
        self
    }

    pub fn add_singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Injectable + ?Sized,
        F: Fn(&Services) -> Result<Arc<T>, DynError> + Send + Sync + 'static,
    {
        self.add_fn(Lifetime::Singleton, factory)
    }

    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Injectable + ?Sized,
        F: Fn(&Services) -> Result<Arc<T>, DynError> + Send + Sync + 'static,
    {
        self.add_fn(Lifetime::Scoped, factory)
    }

    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Injectable + ?Sized,
        F: Fn(&Services) -> Result<Arc<T>, DynError> + Send + Sync + 'static,
    {
        self.add_fn(Lifetime::Transient, factory)
    }

    /// Registers an already created singleton
    pub fn add_instance<T: Injectable>(&mut self, instance: T) -> &mut Self {
        self.add_shared(Arc::new(instance))
    }

    /// Registers an already shared singleton, e.g. an `Arc<dyn Trait>`
    pub fn add_shared<T: Injectable + ?Sized>(&mut self, instance: Arc<T>) -> &mut Self {
        self.add_singleton(move |_| Ok(instance.clone()))
    }

    /// Registers a factory whose instances are disposed by their owner:
    /// the scope for scoped and scope-resolved transient instances, the root container otherwise.
    pub fn add_disposable<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Dispose + Injectable + ?Sized,
        F: Fn(&Services) -> Result<Arc<T>, DynError> + Send + Sync + 'static,
    {
        self.descriptors
            .push(ServiceDescriptor::from_fn(lifetime, factory).disposed_as::<T>());
        self
    }

    pub fn contains<T: Injectable + ?Sized>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.descriptors
            .iter()
            .any(|descriptor| descriptor.info.type_id == type_id)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Finalizes the registrations into the root container
    pub fn build(self) -> DiContainer {
        tracing::debug!(
            "Building root container with {} registrations",
            self.descriptors.len()
        );
        DiContainer::new(self.descriptors)
    }
}
