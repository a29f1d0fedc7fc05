//! Adapter for RPC dispatchers that create one service instance per call.
//!
//! A [ServiceHost] attaches a [DiInstanceProvider] to every contract it implements: each
//! dispatched call resolves the service from a fresh DI scope, which is ambient during the
//! call and disposed when the instance is released. With [CorrelationOptions::enabled] the
//! host also installs a [CorrelationInspector] that correlates each call by the id found in
//! its message or transport headers.

pub mod checks;
mod correlation;
mod dispatch;
mod errors;
mod host;
mod instance;
mod options;

pub use correlation::{CorrelationBehavior, CorrelationInspector};
pub use dispatch::{
    ContractBehavior, ContractDescription, DispatchRuntime, InstanceContext, Message,
    MessageInspector, ServiceEndpoint,
};
pub use errors::DispatchError;
pub use host::ServiceHost;
pub use instance::{DiInstanceProvider, InstanceProvider};
pub use options::{CorrelationOptions, CORRELATION_SECTION};
