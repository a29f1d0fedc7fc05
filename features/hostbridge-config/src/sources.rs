use std::env;

use crate::errors::ConfigError;

/// Flat key/value pairs as produced by a source
pub type ConfigPairs = Vec<(String, Option<String>)>;

/// A source of configuration values, loaded once when the configuration is built
pub trait ConfigurationSource: Send + Sync {
    /// Short name for logging and diagnostics
    fn name(&self) -> &str;

    fn load(&self) -> Result<ConfigPairs, ConfigError>;
}

/// Values provided in code
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pairs: ConfigPairs,
}

impl MemorySource {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        MemorySource {
            pairs: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), Some(value.into())))
                .collect(),
        }
    }
}

impl ConfigurationSource for MemorySource {
    fn name(&self) -> &str {
        "MemorySource"
    }

    fn load(&self) -> Result<ConfigPairs, ConfigError> {
        Ok(self.pairs.clone())
    }
}

/// Process environment variables; `__` in a variable name maps to `:`
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSource {
    prefix: Option<String>,
}

impl EnvironmentSource {
    /// Only variables starting with `prefix` are loaded, with the prefix removed
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        EnvironmentSource {
            prefix: Some(prefix.into()),
        }
    }

    fn map_key(&self, name: &str) -> Option<String> {
        let name = match &self.prefix {
            Some(prefix) => name.strip_prefix(prefix.as_str())?,
            None => name,
        };
        if name.is_empty() {
            return None;
        }
        Some(name.replace("__", ":"))
    }
}

impl ConfigurationSource for EnvironmentSource {
    fn name(&self) -> &str {
        "EnvironmentSource"
    }

    fn load(&self) -> Result<ConfigPairs, ConfigError> {
        Ok(env::vars()
            .filter_map(|(name, value)| Some((self.map_key(&name)?, Some(value))))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_keys_map_double_underscore_to_sections() {
        let source = EnvironmentSource::with_prefix("APP_");
        assert_eq!(
            source.map_key("APP_HostBridge__Correlation__Enabled").as_deref(),
            Some("HostBridge:Correlation:Enabled")
        );
        assert_eq!(source.map_key("OTHER_Value"), None);
        assert_eq!(source.map_key("APP_"), None);
    }
}
