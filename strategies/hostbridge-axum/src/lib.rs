//! Adapter for middleware chains, expressed as `tower` layers for `axum`.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use hostbridge_axum::{CorrelationLayer, RequestScopeLayer, RequestServices};
//!
//! async fn handler(RequestServices(services): RequestServices) -> String {
//!     format!("scoped: {}", services.scope().is_some())
//! }
//!
//! let app: Router = Router::new()
//!     .route("/", get(handler))
//!     .layer(RequestScopeLayer)
//!     .layer(CorrelationLayer::default());
//! ```
//!
//! Layers added later wrap the earlier ones, so above the correlation starts before the scope.

mod correlation;
mod environment;
mod extract;
mod scope;

pub use correlation::{CorrelationLayer, CorrelationMiddleware};
pub use environment::{PipelineEnvironment, RequestItems};
pub use extract::{Inject, RequestServices, RequestServicesRejection};
pub use scope::{RequestScopeLayer, RequestScopeMiddleware};
