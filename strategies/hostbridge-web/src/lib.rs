//! Adapter for request pipelines built from modules with begin, pre-handler and end events.
//!
//! Install [RequestScopeModule] (and optionally [CorrelationModule]) in a [ModulePipeline].
//! Every request then gets its own DI scope, stored in the request items under
//! [SCOPE_KEY](hostbridge_core::request::SCOPE_KEY) and ambient while the handler runs.
//! Handlers opt into member injection with [from_services!](hostbridge_core::from_services).

pub mod checks;
mod context;
mod errors;
mod modules;
mod pipeline;

pub use context::{RequestContext, RequestHandler};
pub use errors::PipelineError;
pub use modules::{CorrelationModule, HttpModule, RequestScopeModule};
pub use pipeline::ModulePipeline;
