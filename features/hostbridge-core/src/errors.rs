use hostbridge_config::ConfigError;
use hostbridge_di::{DynError, RequireError};

/// Errors raised by the accessor, the host and its run helpers
#[derive(thiserror::Error, Debug)]
pub enum HostBridgeError {
    /// The root was used before `initialize`, always a startup ordering bug
    #[error("{0}")]
    NotInitialized(&'static str),

    #[error("HostBridge has already been initialized with a different container")]
    AlreadyInitialized,

    /// The host handed to `initialize` has no container (anymore)
    #[error("Host has no service container")]
    NullContainer,

    #[error(transparent)]
    Require(#[from] RequireError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A hosted service failed to start or stop
    #[error("Hosted service '{service}' failed to {action}: {source}")]
    HostedService {
        service: String,
        action: &'static str,
        #[source]
        source: DynError,
    },

    #[error("Failed to install shutdown signal handlers: {0}")]
    Signal(#[from] std::io::Error),
}
