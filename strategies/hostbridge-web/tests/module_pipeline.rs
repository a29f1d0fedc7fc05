use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use hostbridge_core::{
    accessor, correlation_id, di::{Dispose, DynError, Lifetime, ServiceRegistry}, from_services,
    inject::InjectMembers, request::SCOPE_KEY, sideload, HostBridgeError,
};
use hostbridge_web::{
    checks, CorrelationModule, ModulePipeline, PipelineError, RequestContext, RequestHandler,
    RequestScopeModule,
};
use http::{HeaderMap, HeaderValue};
use serial_test::serial;

static DISPOSED: AtomicUsize = AtomicUsize::new(0);
static NEXT: AtomicUsize = AtomicUsize::new(0);

struct Basket(usize);
impl Dispose for Basket {
    fn dispose(&self) {
        DISPOSED.fetch_add(1, Ordering::SeqCst);
    }
}

struct Catalog;

fn initialize() {
    accessor::reset_for_tests();
    let mut registry = ServiceRegistry::new();
    registry
        .add_instance(Catalog)
        .add_disposable(Lifetime::Scoped, |_| {
            Ok(Arc::new(Basket(NEXT.fetch_add(1, Ordering::SeqCst))))
        });
    accessor::initialize_container(&registry.build()).unwrap();
}

fn pipeline() -> ModulePipeline {
    ModulePipeline::new()
        .add_module(RequestScopeModule)
        .add_module(CorrelationModule::default())
}

#[derive(Default)]
struct BasketPage {
    basket: Option<Arc<Basket>>,
    catalog: Option<Arc<Catalog>>,
    seen_correlation: Option<String>,
    ambient_basket: Option<usize>,
    fail: bool,
}
from_services!(BasketPage { basket, catalog });

impl RequestHandler for BasketPage {
    fn process_request(&mut self, context: &RequestContext) -> Result<(), DynError> {
        assert!(context.items().contains_key(SCOPE_KEY));
        self.seen_correlation = correlation_id();
        self.ambient_basket = Some(sideload::required::<Basket>()?.0);
        match self.fail {
            true => Err("page exploded".into()),
            false => Ok(()),
        }
    }

    fn injectable(&mut self) -> Option<&mut dyn InjectMembers> {
        Some(self)
    }
}

fn request_with_correlation(id: &str) -> RequestContext {
    let mut headers = HeaderMap::new();
    headers.insert("x-correlation-id", HeaderValue::from_str(id).unwrap());
    RequestContext::new(headers)
}

#[test]
#[serial]
fn request_gets_scope_correlation_and_injected_members() {
    initialize();
    let disposed_before = DISPOSED.load(Ordering::SeqCst);
    let mut context = request_with_correlation("abc123");
    let mut page = BasketPage::default();

    pipeline().execute(&mut context, &mut page).unwrap();

    let basket = page.basket.as_ref().unwrap();
    assert!(page.catalog.is_some());
    assert_eq!(page.ambient_basket, Some(basket.0));
    assert_eq!(page.seen_correlation.as_deref(), Some("abc123"));

    assert!(!context.items().contains_key(SCOPE_KEY));
    assert_eq!(correlation_id(), None);
    assert!(accessor::ambient_scope().is_none());
    assert_eq!(DISPOSED.load(Ordering::SeqCst), disposed_before + 1);
}

#[test]
#[serial]
fn missing_header_generates_an_id() {
    initialize();
    let mut first = BasketPage::default();
    let mut second = BasketPage::default();

    pipeline().execute(&mut RequestContext::new(HeaderMap::new()), &mut first).unwrap();
    pipeline().execute(&mut RequestContext::new(HeaderMap::new()), &mut second).unwrap();

    let first = first.seen_correlation.unwrap();
    assert!(!first.is_empty());
    assert_ne!(Some(first), second.seen_correlation);
}

#[test]
#[serial]
fn end_runs_when_the_handler_fails() {
    initialize();
    let disposed_before = DISPOSED.load(Ordering::SeqCst);
    let mut context = request_with_correlation("failing");
    let mut page = BasketPage {
        fail: true,
        ..Default::default()
    };

    let err = pipeline().execute(&mut context, &mut page).unwrap_err();

    assert!(matches!(err, PipelineError::Handler(_)));
    assert!(!context.items().contains_key(SCOPE_KEY));
    assert_eq!(correlation_id(), None);
    assert!(accessor::ambient_scope().is_none());
    assert_eq!(DISPOSED.load(Ordering::SeqCst), disposed_before + 1);
}

#[test]
#[serial]
fn begin_without_root_fails_loudly() {
    accessor::reset_for_tests();
    let mut context = RequestContext::new(HeaderMap::new());
    let mut page = BasketPage::default();

    let err = pipeline().execute(&mut context, &mut page).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Module { source: HostBridgeError::NotInitialized(_), .. }
    ));
    assert!(page.seen_correlation.is_none());
}

#[test]
#[serial]
fn concurrent_requests_are_isolated() {
    initialize();

    let results: Vec<(usize, String, usize)> = thread::scope(|threads| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                threads.spawn(move || {
                    let mut context = request_with_correlation(&format!("req-{i}"));
                    let mut page = BasketPage::default();
                    pipeline().execute(&mut context, &mut page).unwrap();
                    let catalog = page.catalog.unwrap();
                    (
                        page.basket.unwrap().0,
                        page.seen_correlation.unwrap(),
                        Arc::as_ptr(&catalog) as usize,
                    )
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut baskets: Vec<_> = results.iter().map(|r| r.0).collect();
    baskets.sort_unstable();
    baskets.dedup();
    assert_eq!(baskets.len(), 8);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.1, format!("req-{i}"));
    }
    assert!(results.iter().all(|r| r.2 == results[0].2));
}

#[test]
#[serial]
fn request_services_falls_back_to_root_without_the_module() {
    initialize();
    let context = RequestContext::new(HeaderMap::new());

    let services = context.request_services().unwrap();
    assert!(services.scope().is_none());
    assert!(services.require::<Catalog>().is_ok());
}

#[test]
#[serial]
fn checks_report_missing_module_and_scope() {
    initialize();

    let findings = checks::verify_web(&ModulePipeline::new(), None);
    let codes: Vec<_> = findings.iter().map(|f| f.code()).collect();
    assert_eq!(codes, vec![checks::MISSING_MODULE, checks::NO_REQUEST]);

    let unscoped = RequestContext::new(HeaderMap::new());
    let findings = checks::verify_web(&pipeline(), Some(&unscoped));
    let codes: Vec<_> = findings.iter().map(|f| f.code()).collect();
    assert_eq!(codes, vec![checks::MISSING_SCOPE]);
}
