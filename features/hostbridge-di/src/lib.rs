//! Service registration and resolution for HostBridge.
//!
//! A [ServiceRegistry] collects registrations and is built into a root [DiContainer].
//! Scoped services live in a [Scope] created from the root; requests, RPC calls and
//! hosted work each run inside their own scope.
//!
//! ```
//! use std::sync::Arc;
//! use hostbridge_di::ServiceRegistry;
//!
//! struct Clock;
//! let mut registry = ServiceRegistry::new();
//! registry.add_singleton(|_| Ok(Arc::new(Clock)));
//!
//! let root = registry.build();
//! let scope = root.create_scope();
//! let _clock: Arc<Clock> = scope.require().unwrap();
//! scope.dispose();
//! ```

mod container;
mod errors;
mod factories;
mod registry;
mod resolver;
mod scope;
mod services;
mod types;

pub use container::DiContainer;
pub use errors::RequireError;
pub use factories::InstanceFactory;
pub use registry::ServiceRegistry;
pub use resolver::Resolver;
pub use scope::Scope;
pub use services::Services;
pub use types::{Dispose, DynError, Injectable, Instance, Lifetime, TypeInfo};
