use std::sync::Arc;

use crate::{
    services::Services,
    types::{Dispose, DynError, Injectable, Instance, Lifetime, TypeInfo},
};

/// A Factory providing instances of a given contract
pub trait InstanceFactory: Send + Sync + 'static {
    type Provides: Injectable + ?Sized;

    /// Returns the typeinfo about the factory's provided contract
    fn supplies() -> TypeInfo {
        TypeInfo::of::<Self::Provides>()
    }

    /// Constructs a new instance of the factory's provided contract
    ///
    /// `services` resolves from the scope the instance will live in,
    /// or from the root for singletons
    fn construct(&self, services: &Services) -> Result<Arc<Self::Provides>, DynError>;
}
pub(crate) type ErasedFactory = dyn Fn(&Services) -> Result<Instance, DynError> + Send + Sync;
pub(crate) type ErasedDispose = dyn Fn(&Instance) + Send + Sync;

/// A registered contract with its lifetime
pub(crate) struct ServiceDescriptor {
    pub(crate) info: TypeInfo,
    pub(crate) lifetime: Lifetime,
    pub(crate) factory: Box<ErasedFactory>,
    /// Set when instances must be disposed by their owner
    pub(crate) disposer: Option<Box<ErasedDispose>>,
}

impl ServiceDescriptor {
    pub(crate) fn new<Factory: InstanceFactory>(lifetime: Lifetime, factory: Factory) -> Self {
        ServiceDescriptor {
            info: Factory::supplies(),
            lifetime,
            factory: Box::new(move |services: &Services| {
                factory.construct(services).map(Instance::new)
            }),
            disposer: None,
        }
    }

    /// Descriptor for a plain factory closure
    pub(crate) fn from_fn<T, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: Injectable + ?Sized,
        F: Fn(&Services) -> Result<Arc<T>, DynError> + Send + Sync + 'static,
    {
        ServiceDescriptor {
            info: TypeInfo::of::<T>(),
            lifetime,
            factory: Box::new(move |services: &Services| factory(services).map(Instance::new)),
            disposer: None,
        }
    }

    pub(crate) fn disposed_as<T: Dispose + Injectable + ?Sized>(mut self) -> Self {
        self.disposer = Some(Box::new(|instance: &Instance| {
            if let Ok(service) = instance.downcast::<T>() {
                service.dispose();
            }
        }));
        self
    }
}
