use hostbridge_core::{di::DynError, HostBridgeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A module failed in its begin event, the handler did not run
    #[error("Module '{module}' failed to begin the request: {source}")]
    Module {
        module: String,
        #[source]
        source: HostBridgeError,
    },

    #[error("Request handler failed: {0}")]
    Handler(#[source] DynError),
}
