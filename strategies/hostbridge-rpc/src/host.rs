use std::collections::BTreeMap;

use hostbridge_core::di::{DynError, Instance};

use crate::{
    correlation::CorrelationBehavior,
    dispatch::{ContractBehavior, DispatchRuntime, Message, ServiceEndpoint},
    errors::DispatchError,
    instance::DiInstanceProvider,
    options::CorrelationOptions,
};

/// Hosts one service and the endpoints of the contracts it implements
pub struct ServiceHost {
    service: String,
    endpoints: Vec<ServiceEndpoint>,
    options: CorrelationOptions,
    runtimes: BTreeMap<String, DispatchRuntime>,
    opened: bool,
}

impl ServiceHost {
    pub fn new(service: impl Into<String>) -> Self {
        ServiceHost {
            service: service.into(),
            endpoints: Vec::new(),
            options: CorrelationOptions::default(),
            runtimes: BTreeMap::new(),
            opened: false,
        }
    }

    pub fn with_correlation(mut self, options: CorrelationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn add_endpoint(mut self, endpoint: ServiceEndpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Attaches the DI instance provider to every implemented contract, and the correlation
    /// behavior where the options ask for it. Opening twice has no further effect.
    pub fn open(&mut self) {
        if self.opened {
            return;
        }

        for endpoint in &self.endpoints {
            let contract = &endpoint.contract;
            let runtime = self.runtimes.entry(contract.name().to_string()).or_default();

            DiInstanceProvider::new(contract.contract_type())
                .apply_dispatch_behavior(contract, endpoint, runtime);

            let correlated = !contract.correlation_disabled()
                && self.options.applies_to(contract.name(), &endpoint.binding);
            if correlated {
                CorrelationBehavior::new(self.options.header_name.clone())
                    .apply_dispatch_behavior(contract, endpoint, runtime);
            }
            tracing::debug!(
                service = %self.service,
                contract = contract.name(),
                binding = %endpoint.binding,
                correlated,
                "Contract attached"
            );
        }
        self.opened = true;
    }

    pub fn runtime(&self, contract: &str) -> Option<&DispatchRuntime> {
        self.runtimes.get(contract)
    }

    /// Contracts of this host with their runtime, `None` until the host is open
    pub fn contracts(&self) -> impl Iterator<Item = (&str, Option<&DispatchRuntime>)> {
        self.endpoints.iter().map(|endpoint| {
            let name = endpoint.contract.name();
            (name, self.runtimes.get(name))
        })
    }

    /// Dispatches one call to `contract`
    pub fn dispatch<R>(
        &self,
        contract: &str,
        request: &Message,
        operation: impl FnOnce(&Instance, &Message) -> Result<R, DynError>,
    ) -> Result<R, DispatchError> {
        self.runtimes
            .get(contract)
            .ok_or_else(|| DispatchError::UnknownContract(contract.to_string()))?
            .dispatch(contract, request, operation)
    }
}
