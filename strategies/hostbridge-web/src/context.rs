use hostbridge_core::{
    correlation::CorrelationGuard,
    di::{DynError, Scope, Services},
    flow::Restore,
    inject::InjectMembers,
    request::{request_services, RequestBag},
    HostBridgeError,
};
use http::HeaderMap;

/// One request travelling through a [ModulePipeline](crate::ModulePipeline).
///
/// Holds state bound to the request thread, so it is not `Send`.
pub struct RequestContext {
    headers: HeaderMap,
    items: RequestBag,
    pub(crate) ambient: Option<Restore<Scope>>,
    pub(crate) correlation: Option<CorrelationGuard>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap) -> Self {
        RequestContext {
            headers,
            items: RequestBag::new(),
            ambient: None,
            correlation: None,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name` if it is valid text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn items(&self) -> &RequestBag {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut RequestBag {
        &mut self.items
    }

    /// Resolver of this request: its scope, or the root without one
    pub fn request_services(&self) -> Result<Services, HostBridgeError> {
        request_services(None, Some(&self.items))
    }

    /// Correlation id started by the [CorrelationModule](crate::CorrelationModule)
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation.as_ref().map(CorrelationGuard::id)
    }
}

/// The code serving a request, e.g. a page
pub trait RequestHandler {
    fn process_request(&mut self, context: &RequestContext) -> Result<(), DynError>;

    /// Handlers with injectable members return themselves here
    fn injectable(&mut self) -> Option<&mut dyn InjectMembers> {
        None
    }
}
