use hostbridge_core::{
    accessor,
    correlation::{Correlation, CORRELATION_HEADER},
    request::{begin_request_scope, end_request_scope},
    HostBridgeError,
};

use crate::context::{RequestContext, RequestHandler};

/// A participant in the request events of a [ModulePipeline](crate::ModulePipeline)
pub trait HttpModule: Send + Sync {
    fn name(&self) -> &str;

    fn begin_request(&self, context: &mut RequestContext) -> Result<(), HostBridgeError>;

    fn pre_handler_execute(
        &self,
        _context: &mut RequestContext,
        _handler: &mut dyn RequestHandler,
    ) {
    }

    /// Runs for every module whose begin succeeded, also when the handler failed
    fn end_request(&self, context: &mut RequestContext);
}

/// Gives every request its own DI scope.
///
/// The scope is stored in the request items, ambient for the request and disposed
/// when the request ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestScopeModule;

impl RequestScopeModule {
    pub const NAME: &'static str = "HostBridgeRequestScope";
}

impl HttpModule for RequestScopeModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn begin_request(&self, context: &mut RequestContext) -> Result<(), HostBridgeError> {
        let scope = begin_request_scope(context.items_mut())?;
        context.ambient = Some(accessor::enter_scope(&scope));
        Ok(())
    }

    fn pre_handler_execute(&self, context: &mut RequestContext, handler: &mut dyn RequestHandler) {
        let Some(scope) = context.items().scope() else {
            return;
        };
        if let Some(target) = handler.injectable() {
            target.inject_members(&scope.services());
        }
    }

    fn end_request(&self, context: &mut RequestContext) {
        if let Some(ambient) = context.ambient.take() {
            ambient.restore();
        }
        end_request_scope(context.items_mut());
    }
}

/// Correlates every request by the id in its correlation header, or a new one
#[derive(Debug, Clone)]
pub struct CorrelationModule {
    header_name: String,
}

impl Default for CorrelationModule {
    fn default() -> Self {
        CorrelationModule::new(CORRELATION_HEADER)
    }
}

impl CorrelationModule {
    pub const NAME: &'static str = "HostBridgeCorrelation";

    pub fn new(header_name: impl Into<String>) -> Self {
        CorrelationModule {
            header_name: header_name.into(),
        }
    }
}

impl HttpModule for CorrelationModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn begin_request(&self, context: &mut RequestContext) -> Result<(), HostBridgeError> {
        let incoming = context.header(&self.header_name);
        let guard = Correlation::begin(true, incoming, &self.header_name);
        context.correlation = Some(guard);
        Ok(())
    }

    fn end_request(&self, context: &mut RequestContext) {
        if let Some(guard) = context.correlation.take() {
            guard.dispose();
        }
    }
}
