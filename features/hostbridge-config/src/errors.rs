use std::path::PathBuf;

/// Errors when building or binding configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A source could not be read at all
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required key has no value
    #[error("Configuration key '{0}' is missing")]
    Missing(String),

    /// A section could not be deserialized into the requested type
    #[error("Failed to bind configuration section '{section}': {message}")]
    Bind { section: String, message: String },
}
