use std::{any::Any, sync::Arc};

use hostbridge_core::correlation::{Correlation, CorrelationGuard};

use crate::dispatch::{
    ContractBehavior, ContractDescription, DispatchRuntime, InstanceContext, Message,
    MessageInspector, ServiceEndpoint,
};

/// Installs one [CorrelationInspector] per dispatch runtime
#[derive(Debug, Clone)]
pub struct CorrelationBehavior {
    header_name: String,
}

impl CorrelationBehavior {
    pub fn new(header_name: impl Into<String>) -> Self {
        CorrelationBehavior {
            header_name: header_name.into(),
        }
    }
}

impl ContractBehavior for CorrelationBehavior {
    fn apply_dispatch_behavior(
        &self,
        _contract: &ContractDescription,
        _endpoint: &ServiceEndpoint,
        runtime: &mut DispatchRuntime,
    ) {
        if !runtime.has_inspector::<CorrelationInspector>() {
            let inspector = CorrelationInspector::new(self.header_name.clone());
            runtime.add_message_inspector(Arc::new(inspector));
        }
    }
}

/// Correlates a call by the id in its message headers, then its HTTP headers
#[derive(Debug, Clone)]
pub struct CorrelationInspector {
    header_name: String,
}

impl CorrelationInspector {
    pub fn new(header_name: impl Into<String>) -> Self {
        CorrelationInspector {
            header_name: header_name.into(),
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    fn incoming_id<'m>(&self, request: &'m Message) -> Option<&'m str> {
        request.header(&self.header_name).or_else(|| {
            request
                .http_headers()?
                .get(self.header_name.as_str())?
                .to_str()
                .ok()
        })
    }
}

impl MessageInspector for CorrelationInspector {
    fn after_receive_request(
        &self,
        request: &Message,
        _context: &mut InstanceContext,
    ) -> Box<dyn Any> {
        let guard = Correlation::begin(true, self.incoming_id(request), &self.header_name);
        Box::new(guard)
    }

    fn before_send_reply(&self, state: Box<dyn Any>) {
        if let Ok(guard) = state.downcast::<CorrelationGuard>() {
            guard.dispose();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
