//! HostBridge core: lets request based legacy pipelines run on a DI container.
//!
//! - [builder] / [host]: build a [LegacyHost](host::LegacyHost) and drive its hosted services
//! - [run]: run-to-completion helpers with bounded, cooperative shutdown
//! - [accessor]: the process root and the ambient scope of the current call context
//! - [correlation]: correlation ids and their logging span
//! - [request] / [inject]: the request slot, resolver fallback and member injection used by
//!   the pipeline adapters
//! - [sideload], [heartbeat], [propagation]: helpers for application code

pub mod accessor;
pub mod builder;
pub mod cancel;
pub mod correlation;
mod errors;
pub mod flow;
pub mod heartbeat;
pub mod host;
pub mod inject;
pub mod logging;
pub mod propagation;
pub mod request;
pub mod run;
pub mod sideload;

pub use hostbridge_config as config;
pub use hostbridge_di as di;

pub use cancel::CancellationToken;
pub use correlation::{correlation_id, Correlation, CorrelationAccessor, CORRELATION_HEADER};
pub use errors::HostBridgeError;
pub use host::{AddHostedService, Host, HostContext, HostedService, LegacyHost};
