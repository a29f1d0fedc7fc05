use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// All errors must be Send + Sync, factories run on request threads
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// We assume that services are shared between request threads
/// So anything registered needs to be Send + Sync + 'static
///
/// Contracts may be unsized, e.g. `dyn Clock`
pub trait Injectable: Send + Sync + 'static {}
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// Implemented by services which hold resources that must be released when
/// their owning scope (or the root container) is disposed.
pub trait Dispose: Send + Sync {
    fn dispose(&self);
}

/// How long a resolved instance lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance for the lifetime of the root container
    Singleton,
    /// One instance per scope
    Scoped,
    /// A new instance per resolution
    Transient,
}

/// Type erased instance of a contract
///
/// The contract may be unsized, so the `Arc<T>` itself is stored behind `Any`.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub(crate) fn new<T: Injectable + ?Sized>(value: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// Returns the stored `Arc<T>`, or the stored type name if `T` does not match
    pub fn downcast<T: Injectable + ?Sized>(&self) -> Result<Arc<T>, &'static str> {
        match self.value.downcast_ref::<Arc<T>>() {
            Some(downcasted) => Ok(downcasted.clone()),
            None => Err(self.info.type_name),
        }
    }

    /// True if both instances point at the same allocation
    pub fn same_as(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
