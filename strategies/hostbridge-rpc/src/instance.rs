use std::any::Any;

use hostbridge_core::{
    accessor,
    di::{Instance, TypeInfo},
    request::{begin_request_scope, end_request_scope},
};

use crate::{
    dispatch::{
        ContractBehavior, ContractDescription, DispatchRuntime, InstanceContext, Message,
        ServiceEndpoint,
    },
    errors::DispatchError,
};

/// Creates and releases the service instance of a call
pub trait InstanceProvider: Send + Sync {
    fn get_instance(
        &self,
        context: &mut InstanceContext,
        message: Option<&Message>,
    ) -> Result<Instance, DispatchError>;

    fn release_instance(&self, context: &mut InstanceContext, instance: Instance);

    fn as_any(&self) -> &dyn Any;
}

/// Resolves the contract from a new scope per call and disposes that scope on release.
///
/// Does not decide how often the dispatcher asks for instances, it only guarantees that
/// every instance gets its own scope.
#[derive(Debug, Clone, Copy)]
pub struct DiInstanceProvider {
    contract: TypeInfo,
}

impl DiInstanceProvider {
    pub fn new(contract: TypeInfo) -> Self {
        DiInstanceProvider { contract }
    }

    pub fn contract(&self) -> TypeInfo {
        self.contract
    }
}

impl InstanceProvider for DiInstanceProvider {
    fn get_instance(
        &self,
        context: &mut InstanceContext,
        _message: Option<&Message>,
    ) -> Result<Instance, DispatchError> {
        if !accessor::is_initialized() {
            return Err(hostbridge_core::HostBridgeError::NotInitialized(
                "HostBridge RPC is not initialized. Call accessor::initialize(&host) before opening service hosts.",
            )
            .into());
        }

        let scope = begin_request_scope(&mut context.extensions)?;
        match scope.services().resolve_instance(self.contract) {
            Ok(instance) => Ok(instance),
            Err(e) => {
                end_request_scope(&mut context.extensions);
                Err(e.into())
            }
        }
    }

    fn release_instance(&self, context: &mut InstanceContext, instance: Instance) {
        drop(instance);
        end_request_scope(&mut context.extensions);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ContractBehavior for DiInstanceProvider {
    fn apply_dispatch_behavior(
        &self,
        _contract: &ContractDescription,
        _endpoint: &ServiceEndpoint,
        runtime: &mut DispatchRuntime,
    ) {
        runtime.set_instance_provider(std::sync::Arc::new(*self));
    }
}
