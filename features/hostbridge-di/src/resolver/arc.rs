use std::sync::Arc;

use crate::{errors::RequireError, resolver::Resolver, services::Services, types::Injectable};

impl<T: Injectable + ?Sized> Resolver for Arc<T> {
    fn resolve(services: &Services) -> Result<Self, RequireError> {
        services.require::<T>()
    }
}

impl<Resolvable: Resolver> Resolver for Option<Resolvable> {
    fn resolve(services: &Services) -> Result<Self, RequireError> {
        match Resolvable::resolve(services) {
            Ok(resolved) => Ok(Some(resolved)),
            // If the required type is not registered Option does not fail
            Err(RequireError::TypeMissing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<T: Injectable + ?Sized> Resolver for Vec<Arc<T>> {
    fn resolve(services: &Services) -> Result<Self, RequireError> {
        services.require_all::<T>()
    }
}

macro_rules! tuple_resolver {
    ($($name:ident),+) => {
        impl<$($name: Resolver),+> Resolver for ($($name,)+) {
            fn resolve(services: &Services) -> Result<Self, RequireError> {
                Ok(($($name::resolve(services)?,)+))
            }
        }
    };
}

tuple_resolver!(A, B);
tuple_resolver!(A, B, C);
tuple_resolver!(A, B, C, D);
