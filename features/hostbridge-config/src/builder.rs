use std::path::PathBuf;

use crate::{
    app_config::AppConfigSource,
    configuration::Configuration,
    errors::ConfigError,
    sources::{ConfigurationSource, EnvironmentSource, MemorySource},
};

/// Layers configuration sources; later sources override earlier ones
#[derive(Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Box<dyn ConfigurationSource>>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, source: impl ConfigurationSource + 'static) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn add_in_memory<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.add_source(MemorySource::new(pairs))
    }

    /// Adds all environment variables, or only those starting with `prefix`
    pub fn add_environment_variables(&mut self, prefix: Option<&str>) -> &mut Self {
        match prefix {
            Some(prefix) => self.add_source(EnvironmentSource::with_prefix(prefix)),
            None => self.add_source(EnvironmentSource::default()),
        }
    }

    /// Adds the legacy app config file (settings and connection strings)
    pub fn add_app_config(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.add_source(AppConfigSource::new(path))
    }

    /// Names of the registered sources, in registration order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    pub fn build(&self) -> Result<Configuration, ConfigError> {
        let mut pairs = Vec::new();
        for source in &self.sources {
            let loaded = source.load()?;
            tracing::debug!(
                source = source.name(),
                count = loaded.len(),
                "Loaded configuration source"
            );
            pairs.extend(loaded);
        }
        Ok(Configuration::from_pairs(pairs))
    }
}
