use hostbridge_core::{
    di::{DynError, RequireError},
    HostBridgeError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    HostBridge(#[from] HostBridgeError),

    #[error("Failed to create the service instance: {0}")]
    Instance(#[from] RequireError),

    #[error("No endpoint implements contract '{0}'")]
    UnknownContract(String),

    #[error("Contract '{0}' has no instance provider")]
    NoInstanceProvider(String),

    #[error("Operation failed: {0}")]
    Operation(#[source] DynError),
}
