//! HostBridge Config provides the configuration every host is built with.
//!
//! It is split into three parts:
//! 1. [ConfigurationBuilder]: layers sources, later sources override earlier ones
//! 2. [Configuration]: the immutable, case-insensitive result, with sections and serde binding
//! 3. [app_config]: the bridge exposing legacy settings and connection strings
//!
//! # Examples
//!
//! ```rust
//! use hostbridge_config::ConfigurationBuilder;
//!
//! #[derive(serde::Deserialize)]
//! struct Correlation {
//!     enabled: bool,
//!     header_name: String,
//! }
//!
//! let config = ConfigurationBuilder::new()
//!     .add_in_memory([
//!         ("HostBridge:Correlation:Enabled", "true"),
//!         ("HostBridge:Correlation:HeaderName", "X-Correlation-Id"),
//!     ])
//!     .build()
//!     .unwrap();
//!
//! let correlation: Correlation = config.bind_section("HostBridge:Correlation").unwrap();
//! assert!(correlation.enabled);
//! assert_eq!(config.get("hostbridge:correlation:headername"), Some("X-Correlation-Id"));
//! ```

pub mod app_config;
mod bind;
mod builder;
mod configuration;
mod errors;
mod sources;

pub use builder::ConfigurationBuilder;
pub use configuration::{Configuration, KEY_DELIMITER};
pub use errors::ConfigError;
pub use sources::{ConfigPairs, ConfigurationSource, EnvironmentSource, MemorySource};
