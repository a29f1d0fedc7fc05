use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use hostbridge_config::Configuration;
use hostbridge_di::{DiContainer, DynError, ServiceRegistry, Services};

use crate::{cancel::CancellationToken, errors::HostBridgeError};

/// A long running unit started and stopped by the host
#[async_trait]
pub trait HostedService: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn start(&self, token: &CancellationToken) -> Result<(), DynError>;

    async fn stop(&self, token: &CancellationToken) -> Result<(), DynError>;
}

/// A built host: owns the root container and the hosted services
#[async_trait]
pub trait Host: Send + Sync {
    /// The root container, `None` once the host has been disposed
    fn services(&self) -> Option<DiContainer>;

    /// Starts every hosted service in registration order, stopping at the first failure
    async fn start(&self, token: &CancellationToken) -> Result<(), HostBridgeError>;

    /// Stops every hosted service in reverse registration order.
    ///
    /// Every service is asked to stop; the first failure is returned afterwards.
    async fn stop(&self, token: &CancellationToken) -> Result<(), HostBridgeError>;

    /// Releases the root container. Repeated calls have no effect.
    fn dispose(&self);
}

/// Environment and configuration available while services are registered
#[derive(Debug, Clone)]
pub struct HostContext {
    configuration: Configuration,
    environment: String,
}

impl HostContext {
    pub const DEFAULT_ENVIRONMENT: &'static str = "Production";

    pub fn new(configuration: Configuration, environment: impl Into<String>) -> Self {
        HostContext {
            configuration,
            environment: environment.into(),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn environment_name(&self) -> &str {
        &self.environment
    }

    pub fn is_environment(&self, name: &str) -> bool {
        self.environment.eq_ignore_ascii_case(name)
    }

    pub fn is_production(&self) -> bool {
        self.is_environment(Self::DEFAULT_ENVIRONMENT)
    }

    pub fn is_development(&self) -> bool {
        self.is_environment("Development")
    }
}

/// The host produced by [LegacyHostBuilder](crate::builder::LegacyHostBuilder)
pub struct LegacyHost {
    container: Mutex<Option<DiContainer>>,
    hosted_services: Vec<Arc<dyn HostedService>>,
    context: HostContext,
}

impl LegacyHost {
    pub(crate) fn new(
        container: DiContainer,
        hosted_services: Vec<Arc<dyn HostedService>>,
        context: HostContext,
    ) -> Self {
        LegacyHost {
            container: Mutex::new(Some(container)),
            hosted_services,
            context,
        }
    }

    pub fn context(&self) -> &HostContext {
        &self.context
    }

    pub fn hosted_services(&self) -> &[Arc<dyn HostedService>] {
        &self.hosted_services
    }
}

#[async_trait]
impl Host for LegacyHost {
    fn services(&self) -> Option<DiContainer> {
        self.container
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn start(&self, token: &CancellationToken) -> Result<(), HostBridgeError> {
        for service in &self.hosted_services {
            tracing::debug!(service = service.name(), "Starting hosted service");
            service
                .start(token)
                .await
                .map_err(|source| HostBridgeError::HostedService {
                    service: service.name().to_string(),
                    action: "start",
                    source,
                })?;
        }

        tracing::info!(
            count = self.hosted_services.len(),
            "HostBridge started ({} hosted service(s))",
            self.hosted_services.len()
        );
        Ok(())
    }

    async fn stop(&self, token: &CancellationToken) -> Result<(), HostBridgeError> {
        let mut first_failure = None;
        for service in self.hosted_services.iter().rev() {
            tracing::debug!(service = service.name(), "Stopping hosted service");
            if let Err(source) = service.stop(token).await {
                tracing::warn!(
                    service = service.name(),
                    "Hosted service failed to stop: {}",
                    source
                );
                first_failure.get_or_insert(HostBridgeError::HostedService {
                    service: service.name().to_string(),
                    action: "stop",
                    source,
                });
            }
        }

        tracing::info!("HostBridge stopped");
        match first_failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn dispose(&self) {
        let container = self
            .container
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(container) = container {
            container.dispose();
            tracing::debug!("Host disposed");
        }
    }
}

/// Registration helpers for hosted services
pub trait AddHostedService {
    /// Registers a hosted service; hosted services are started in registration order
    fn add_hosted_service<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: HostedService + 'static,
        F: Fn(&Services) -> Result<T, DynError> + Send + Sync + 'static;
}

impl AddHostedService for ServiceRegistry {
    fn add_hosted_service<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: HostedService + 'static,
        F: Fn(&Services) -> Result<T, DynError> + Send + Sync + 'static,
    {
        self.add_singleton::<dyn HostedService, _>(move |services| {
            let service: Arc<dyn HostedService> = Arc::new(factory(services)?);
            Ok(service)
        })
    }
}
