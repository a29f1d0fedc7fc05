use std::sync::Arc;

use hostbridge_config::{Configuration, ConfigurationBuilder};
use hostbridge_di::ServiceRegistry;

use crate::{
    errors::HostBridgeError,
    host::{HostContext, HostedService, LegacyHost},
    logging::LoggingBuilder,
};

type ConfigureServices = Box<dyn FnOnce(&HostContext, &mut ServiceRegistry)>;

/// Builds a [LegacyHost]: configuration, logging, services and hosted services
///
/// ```no_run
/// use hostbridge_core::{builder::LegacyHostBuilder, accessor};
///
/// let host = LegacyHostBuilder::new()
///     .use_environment("Development")
///     .configure_app_configuration(|config| {
///         config.add_app_config("app.config.toml").add_environment_variables(Some("APP_"));
///     })
///     .configure_services(|context, services| {
///         let greeting = context.configuration().get("Greeting").unwrap_or("hello").to_string();
///         services.add_instance(greeting);
///     })
///     .build()
///     .unwrap();
/// accessor::initialize(&host).unwrap();
/// ```
pub struct LegacyHostBuilder {
    environment: String,
    configuration: ConfigurationBuilder,
    logging: Option<LoggingBuilder>,
    configure_services: Vec<ConfigureServices>,
}

impl Default for LegacyHostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyHostBuilder {
    pub fn new() -> Self {
        LegacyHostBuilder {
            environment: HostContext::DEFAULT_ENVIRONMENT.to_string(),
            configuration: ConfigurationBuilder::new(),
            logging: None,
            configure_services: Vec::new(),
        }
    }

    pub fn use_environment(mut self, name: impl Into<String>) -> Self {
        self.environment = name.into();
        self
    }

    pub fn configure_app_configuration(
        mut self,
        configure: impl FnOnce(&mut ConfigurationBuilder),
    ) -> Self {
        configure(&mut self.configuration);
        self
    }

    /// Installs a global `fmt` subscriber on build
    pub fn configure_logging(mut self, configure: impl FnOnce(&mut LoggingBuilder)) -> Self {
        configure(self.logging.get_or_insert_with(LoggingBuilder::default));
        self
    }

    /// Registers services; callbacks run in the order they were added
    pub fn configure_services(
        mut self,
        configure: impl FnOnce(&HostContext, &mut ServiceRegistry) + 'static,
    ) -> Self {
        self.configure_services.push(Box::new(configure));
        self
    }

    pub fn build(self) -> Result<LegacyHost, HostBridgeError> {
        let configuration = self.configuration.build()?;
        let context = HostContext::new(configuration.clone(), self.environment);

        if let Some(logging) = &self.logging {
            logging.install();
        }

        let mut registry = ServiceRegistry::new();
        registry
            .add_instance::<Configuration>(configuration)
            .add_instance::<HostContext>(context.clone());
        for configure in self.configure_services {
            configure(&context, &mut registry);
        }

        let container = registry.build();
        let hosted_services: Vec<Arc<dyn HostedService>> = container.require_all()?;
        tracing::debug!(
            environment = context.environment_name(),
            "Built host with {} hosted service(s)",
            hosted_services.len()
        );

        Ok(LegacyHost::new(container, hosted_services, context))
    }
}
