use crate::{errors::RequireError, services::Services};

pub mod arc;

/// Allows custom behaviour on injection
///
/// Implemented for `Arc<T>`, `Option<R>` and `Vec<Arc<T>>`, tuples of resolvers
/// resolve element by element.
pub trait Resolver: Sized {
    fn resolve(services: &Services) -> Result<Self, RequireError>;
}
