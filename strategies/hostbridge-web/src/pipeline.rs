use std::sync::Arc;

use crate::{
    context::{RequestContext, RequestHandler},
    errors::PipelineError,
    modules::HttpModule,
};

/// Drives requests through an ordered list of modules.
///
/// Begin and pre-handler events run in registration order, end events in reverse order.
#[derive(Clone, Default)]
pub struct ModulePipeline {
    modules: Vec<Arc<dyn HttpModule>>,
}

impl ModulePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(mut self, module: impl HttpModule + 'static) -> Self {
        self.modules.push(Arc::new(module));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.iter().any(|module| module.name() == name)
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|module| module.name()).collect()
    }

    /// Serves one request. End events run for every begun module, whatever the outcome.
    pub fn execute(
        &self,
        context: &mut RequestContext,
        handler: &mut dyn RequestHandler,
    ) -> Result<(), PipelineError> {
        let mut begun = 0;
        let mut outcome = Ok(());
        for module in &self.modules {
            if let Err(source) = module.begin_request(context) {
                tracing::error!(module = module.name(), "Failed to begin request: {}", source);
                outcome = Err(PipelineError::Module {
                    module: module.name().to_string(),
                    source,
                });
                break;
            }
            begun += 1;
        }

        if outcome.is_ok() {
            for module in &self.modules {
                module.pre_handler_execute(context, handler);
            }
            outcome = handler
                .process_request(context)
                .map_err(PipelineError::Handler);
        }

        for module in self.modules[..begun].iter().rev() {
            module.end_request(context);
        }
        outcome
    }
}
