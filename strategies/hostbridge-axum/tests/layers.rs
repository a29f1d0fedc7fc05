use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::StatusCode,
    routing::get,
    Router,
};
use hostbridge_axum::{
    CorrelationLayer, Inject, PipelineEnvironment, RequestItems, RequestScopeLayer,
    RequestServices,
};
use hostbridge_core::{
    accessor, correlation_id,
    di::{Dispose, Lifetime, ServiceRegistry},
    request::{begin_request_scope, RequestBag, SCOPE_KEY},
    sideload,
};
use serial_test::serial;
use tower::ServiceExt;

static NEXT: AtomicUsize = AtomicUsize::new(0);
static DISPOSED: AtomicUsize = AtomicUsize::new(0);

struct Cart(usize);
impl Dispose for Cart {
    fn dispose(&self) {
        DISPOSED.fetch_add(1, Ordering::SeqCst);
    }
}

fn initialize() {
    accessor::reset_for_tests();
    let mut registry = ServiceRegistry::new();
    registry
        .add_instance(String::from("shop"))
        .add_disposable(Lifetime::Scoped, |_| {
            Ok(Arc::new(Cart(NEXT.fetch_add(1, Ordering::SeqCst))))
        });
    accessor::initialize_container(&registry.build()).unwrap();
}

async fn describe(
    RequestServices(services): RequestServices,
    Inject(cart): Inject<Cart>,
    Inject(name): Inject<String>,
) -> String {
    let ambient = sideload::required::<Cart>().map(|cart| cart.0).ok();
    let again = services.require::<Cart>().unwrap().0;
    format!(
        "{name} cart={} again={again} ambient={ambient:?} correlation={}",
        cart.0,
        correlation_id().unwrap_or_default()
    )
}

fn app() -> Router {
    Router::new()
        .route("/", get(describe))
        .layer(RequestScopeLayer)
        .layer(CorrelationLayer::default())
}

async fn call(router: Router, request: Request) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
#[serial]
async fn request_gets_scope_and_correlation() {
    initialize();
    let disposed_before = DISPOSED.load(Ordering::SeqCst);

    let request = Request::builder()
        .uri("/")
        .header("X-Correlation-Id", "abc123")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(app(), request).await;

    assert_eq!(status, StatusCode::OK);
    let cart = NEXT.load(Ordering::SeqCst) - 1;
    assert_eq!(
        body,
        format!("shop cart={cart} again={cart} ambient=Some({cart}) correlation=abc123")
    );
    assert_eq!(DISPOSED.load(Ordering::SeqCst), disposed_before + 1);
    assert_eq!(correlation_id(), None);
}

#[tokio::test]
#[serial]
async fn concurrent_requests_get_distinct_scopes() {
    initialize();

    let requests = (0..8).map(|_| {
        tokio::spawn(call(
            app(),
            Request::builder().uri("/").body(Body::empty()).unwrap(),
        ))
    });
    let mut carts = Vec::new();
    for request in requests {
        let (status, body) = request.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        carts.push(body);
    }

    carts.sort();
    carts.dedup();
    assert_eq!(carts.len(), 8);
}

#[tokio::test]
#[serial]
async fn without_the_scope_layer_scoped_services_are_rejected() {
    initialize();
    let router = Router::new()
        .route("/", get(describe))
        .layer(CorrelationLayer::default());

    let (status, _) = call(router, Request::builder().uri("/").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
#[serial]
async fn missing_root_fails_the_request() {
    accessor::reset_for_tests();

    let (status, _) = call(app(), Request::builder().uri("/").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

async fn which_scope(RequestServices(services): RequestServices) -> String {
    services
        .scope()
        .map(|scope| scope.id().to_string())
        .unwrap_or_else(|| "root".to_string())
}

#[tokio::test]
#[serial]
async fn environment_scope_wins_over_request_items() {
    initialize();
    let router = Router::new().route("/", get(which_scope));

    let mut items = RequestBag::new();
    let item_scope = begin_request_scope(&mut items).unwrap();
    let environment_bag = PipelineEnvironment::default();
    let environment_scope = begin_request_scope(&mut environment_bag.lock()).unwrap();

    let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
    request.extensions_mut().insert(RequestItems::new(items));
    let (_, body) = call(router.clone(), request).await;
    assert_eq!(body, item_scope.id().to_string());

    let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
    request.extensions_mut().insert(RequestItems::new(RequestBag::new()));
    request.extensions_mut().insert(environment_bag.clone());
    let (_, body) = call(router.clone(), request).await;
    assert_eq!(body, environment_scope.id().to_string());

    environment_bag.lock().insert(SCOPE_KEY, "not a scope");
    let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
    request.extensions_mut().insert(environment_bag.clone());
    let (_, body) = call(router, request).await;
    assert_eq!(body, "root");

    item_scope.dispose();
    environment_scope.dispose();
}
