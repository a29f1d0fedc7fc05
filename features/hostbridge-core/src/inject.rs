//! Opt-in member injection for handlers created by a legacy pipeline.
//!
//! Pipelines construct handlers themselves, so constructor injection is not available.
//! A handler lists the members to fill with [from_services!](crate::from_services);
//! each listed member is an `Option<Arc<T>>` and is set when `T` resolves from the
//! request scope. Members that cannot be resolved keep their current value.

use std::sync::Arc;

use hostbridge_di::{Injectable, Services};

/// Implemented through [from_services!](crate::from_services)
pub trait InjectMembers {
    fn inject_members(&mut self, services: &Services);
}

/// Sets `member` when `T` resolves; resolution failures are ignored
pub fn inject_member<T: Injectable + ?Sized>(member: &mut Option<Arc<T>>, services: &Services) {
    match services.get::<T>() {
        Ok(Some(service)) => *member = Some(service),
        Ok(None) => {}
        Err(e) => tracing::debug!("Skipping injection of {}: {}", std::any::type_name::<T>(), e),
    }
}

/// Marks members of a handler type for injection from the request scope.
///
/// ```
/// use std::sync::Arc;
/// use hostbridge_core::{from_services, inject::InjectMembers};
///
/// struct Clock;
///
/// #[derive(Default)]
/// struct OrdersPage {
///     clock: Option<Arc<Clock>>,
///     title: String,
/// }
/// from_services!(OrdersPage { clock });
/// ```
#[macro_export]
macro_rules! from_services {
    ($handler:ty { $($member:ident),+ $(,)? }) => {
        impl $crate::inject::InjectMembers for $handler {
            fn inject_members(&mut self, services: &$crate::di::Services) {
                $( $crate::inject::inject_member(&mut self.$member, services); )+
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_di::ServiceRegistry;

    struct Clock;
    struct Missing;
    struct Broken;

    #[derive(Default)]
    struct Handler {
        clock: Option<Arc<Clock>>,
        missing: Option<Arc<Missing>>,
        broken: Option<Arc<Broken>>,
        untouched: Option<Arc<Clock>>,
    }
    crate::from_services!(Handler { clock, missing, broken });

    #[test]
    fn fills_listed_members_and_swallows_failures() {
        let mut registry = ServiceRegistry::new();
        registry
            .add_instance(Clock)
            .add_scoped::<Broken, _>(|_| Err("no database".into()));
        let root = registry.build();
        let scope = root.create_scope();

        let mut handler = Handler::default();
        handler.inject_members(&scope.services());

        assert!(handler.clock.is_some());
        assert!(handler.missing.is_none());
        assert!(handler.broken.is_none());
        assert!(handler.untouched.is_none());
    }
}
