use std::{any::type_name, sync::Arc};

use crate::{
    container::DiContainer,
    errors::RequireError,
    resolver::Resolver,
    scope::Scope,
    types::{Injectable, Instance, TypeInfo},
};

/// A resolver: either the root container or a scope.
///
/// This is what factories receive and what request pipelines hand out.
#[derive(Clone, Debug)]
pub enum Services {
    Root(DiContainer),
    Scope(Scope),
}

impl Services {
    /// The root container, also for scopes
    pub fn root(&self) -> &DiContainer {
        match self {
            Services::Root(root) => root,
            Services::Scope(scope) => scope.root(),
        }
    }

    pub fn scope(&self) -> Option<&Scope> {
        match self {
            Services::Root(_) => None,
            Services::Scope(scope) => Some(scope),
        }
    }

    /// Resolves the last registration of the contract
    pub fn require<T: Injectable + ?Sized>(&self) -> Result<Arc<T>, RequireError> {
        let instance = self.resolve_instance(TypeInfo::of::<T>())?;
        downcast(&instance)
    }

    /// Like [Services::require] but maps an unregistered contract to `None`
    pub fn get<T: Injectable + ?Sized>(&self) -> Result<Option<Arc<T>>, RequireError> {
        match self.require::<T>() {
            Ok(service) => Ok(Some(service)),
            Err(RequireError::TypeMissing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Every registration of the contract, in registration order.
    /// An unregistered contract yields an empty list.
    pub fn require_all<T: Injectable + ?Sized>(&self) -> Result<Vec<Arc<T>>, RequireError> {
        self.resolve_all_instances(TypeInfo::of::<T>())?
            .iter()
            .map(downcast)
            .collect()
    }

    pub fn resolve<R: Resolver>(&self) -> Result<R, RequireError> {
        R::resolve(self)
    }

    /// True if both resolvers are the same root or the same scope
    pub fn same_provider(&self, other: &Services) -> bool {
        match (self, other) {
            (Services::Root(a), Services::Root(b)) => a.ptr_eq(b),
            (Services::Scope(a), Services::Scope(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn resolve_instance(&self, info: TypeInfo) -> Result<Instance, RequireError> {
        self.check_alive(info)?;
        let index = self
            .root()
            .indices(info.type_id)
            .and_then(|indices| indices.last().copied())
            .ok_or(RequireError::TypeMissing(info.type_name))?;

        self.root().resolve_index(index, self.scope())
    }

    pub fn resolve_all_instances(&self, info: TypeInfo) -> Result<Vec<Instance>, RequireError> {
        self.check_alive(info)?;
        let Some(indices) = self.root().indices(info.type_id) else {
            return Ok(Vec::new());
        };

        indices
            .iter()
            .map(|index| self.root().resolve_index(*index, self.scope()))
            .collect()
    }

    fn check_alive(&self, info: TypeInfo) -> Result<(), RequireError> {
        if let Services::Scope(scope) = self {
            if scope.is_disposed() {
                return Err(RequireError::ScopeDisposed(info.type_name));
            }
        }
        if self.root().is_disposed() {
            return Err(RequireError::ContainerDisposed(info.type_name));
        }
        Ok(())
    }
}

fn downcast<T: Injectable + ?Sized>(instance: &Instance) -> Result<Arc<T>, RequireError> {
    instance
        .downcast::<T>()
        .map_err(|actual_type| RequireError::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type,
        })
}

impl From<DiContainer> for Services {
    fn from(root: DiContainer) -> Self {
        Services::Root(root)
    }
}

impl From<Scope> for Services {
    fn from(scope: Scope) -> Self {
        Services::Scope(scope)
    }
}
