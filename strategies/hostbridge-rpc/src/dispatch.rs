use std::{any::Any, fmt, sync::Arc};

use hostbridge_core::{
    accessor,
    di::{DynError, Injectable, Instance, Scope, TypeInfo},
    request::RequestBag,
};
use http::HeaderMap;

use crate::{errors::DispatchError, instance::InstanceProvider};

/// Incoming call: message headers plus the transport headers when carried over HTTP
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub action: String,
    headers: Vec<(String, String)>,
    http_headers: Option<HeaderMap>,
}

impl Message {
    pub fn new(action: impl Into<String>) -> Self {
        Message {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_http_headers(mut self, headers: HeaderMap) -> Self {
        self.http_headers = Some(headers);
        self
    }

    /// Message header by exact name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn http_headers(&self) -> Option<&HeaderMap> {
        self.http_headers.as_ref()
    }
}

/// State of one dispatched call; extensions live as long as the call
#[derive(Default)]
pub struct InstanceContext {
    pub extensions: RequestBag,
}

impl InstanceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope attached by the instance provider
    pub fn scope(&self) -> Option<&Scope> {
        self.extensions.scope()
    }
}

/// Sees every call before and after the operation.
///
/// The value returned by `after_receive_request` is handed back to `before_send_reply`.
pub trait MessageInspector: Send + Sync {
    fn after_receive_request(
        &self,
        request: &Message,
        context: &mut InstanceContext,
    ) -> Box<dyn Any>;

    fn before_send_reply(&self, state: Box<dyn Any>);

    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone)]
pub struct ContractDescription {
    name: String,
    contract_type: TypeInfo,
    correlation_disabled: bool,
}

impl ContractDescription {
    /// Describes contract `T`, resolved from the container on every call
    pub fn of<T: Injectable + ?Sized>(name: impl Into<String>) -> Self {
        ContractDescription {
            name: name.into(),
            contract_type: TypeInfo::of::<T>(),
            correlation_disabled: false,
        }
    }

    /// Opts the contract out of correlation, whatever the options say
    pub fn disable_correlation(mut self) -> Self {
        self.correlation_disabled = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contract_type(&self) -> TypeInfo {
        self.contract_type
    }

    pub fn correlation_disabled(&self) -> bool {
        self.correlation_disabled
    }
}

#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    pub address: String,
    pub binding: String,
    pub contract: ContractDescription,
}

impl ServiceEndpoint {
    pub fn new(
        address: impl Into<String>,
        binding: impl Into<String>,
        contract: ContractDescription,
    ) -> Self {
        ServiceEndpoint {
            address: address.into(),
            binding: binding.into(),
            contract,
        }
    }
}

/// Adjusts the dispatch runtime of a contract when its host opens
pub trait ContractBehavior {
    fn apply_dispatch_behavior(
        &self,
        contract: &ContractDescription,
        endpoint: &ServiceEndpoint,
        runtime: &mut DispatchRuntime,
    );
}

/// Per contract dispatch pipeline: the instance provider plus the message inspectors
#[derive(Default)]
pub struct DispatchRuntime {
    instance_provider: Option<Arc<dyn InstanceProvider>>,
    message_inspectors: Vec<Arc<dyn MessageInspector>>,
}

impl fmt::Debug for DispatchRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchRuntime")
            .field("has_instance_provider", &self.instance_provider.is_some())
            .field("message_inspectors", &self.message_inspectors.len())
            .finish()
    }
}

impl DispatchRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_provider(&self) -> Option<&Arc<dyn InstanceProvider>> {
        self.instance_provider.as_ref()
    }

    pub fn set_instance_provider(&mut self, provider: Arc<dyn InstanceProvider>) {
        self.instance_provider = Some(provider);
    }

    pub fn message_inspectors(&self) -> &[Arc<dyn MessageInspector>] {
        &self.message_inspectors
    }

    pub fn add_message_inspector(&mut self, inspector: Arc<dyn MessageInspector>) {
        self.message_inspectors.push(inspector);
    }

    pub fn has_inspector<I: MessageInspector + 'static>(&self) -> bool {
        self.message_inspectors
            .iter()
            .any(|inspector| inspector.as_any().is::<I>())
    }

    /// Runs one call.
    ///
    /// Inspectors see the request first, then the service instance is created and `operation`
    /// runs with the call's scope as ambient scope. The instance is released and the inspectors
    /// see the reply also when the operation fails.
    pub fn dispatch<R>(
        &self,
        contract: &str,
        request: &Message,
        operation: impl FnOnce(&Instance, &Message) -> Result<R, DynError>,
    ) -> Result<R, DispatchError> {
        let provider = self
            .instance_provider
            .as_ref()
            .ok_or_else(|| DispatchError::NoInstanceProvider(contract.to_string()))?;

        let mut context = InstanceContext::new();
        let states: Vec<Box<dyn Any>> = self
            .message_inspectors
            .iter()
            .map(|inspector| inspector.after_receive_request(request, &mut context))
            .collect();

        let outcome = match provider.get_instance(&mut context, Some(request)) {
            Ok(instance) => {
                let ambient = context.scope().map(accessor::enter_scope);
                let outcome = operation(&instance, request).map_err(DispatchError::Operation);
                drop(ambient);
                provider.release_instance(&mut context, instance);
                outcome
            }
            Err(e) => {
                tracing::error!(contract, "Failed to create service instance: {}", e);
                Err(e)
            }
        };

        for (inspector, state) in self.message_inspectors.iter().zip(states).rev() {
            inspector.before_send_reply(state);
        }
        outcome
    }
}
