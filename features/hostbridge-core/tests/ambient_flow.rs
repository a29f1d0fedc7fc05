use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, OnceLock,
};

use hostbridge_core::{
    accessor,
    di::{DiContainer, ServiceRegistry},
    request::{begin_request_scope, end_request_scope, request_services, RequestBag},
    sideload,
};

static NEXT: AtomicUsize = AtomicUsize::new(0);

struct Unit(usize);

impl Unit {
    fn next() -> Self {
        Unit(NEXT.fetch_add(1, Ordering::SeqCst))
    }
}

struct PerRequest(Unit);
struct Shared(Unit);

/// One root for the whole test binary: the accessor root cannot be replaced
fn root() -> DiContainer {
    static ROOT: OnceLock<DiContainer> = OnceLock::new();
    let root = ROOT.get_or_init(|| {
        let mut registry = ServiceRegistry::new();
        registry
            .add_scoped(|_| Ok(Arc::new(PerRequest(Unit::next()))))
            .add_singleton(|_| Ok(Arc::new(Shared(Unit::next()))));
        registry.build()
    });
    accessor::initialize_container(root).unwrap();
    root.clone()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_see_their_own_ambient_scope() {
    root();

    let tasks = (0..16).map(|_| {
        tokio::spawn(accessor::in_ambient_scope(async {
            let first = accessor::get::<PerRequest>().unwrap();
            tokio::task::yield_now().await;
            let second = accessor::get::<PerRequest>().unwrap();
            assert!(Arc::ptr_eq(&first, &second));
            (first.0 .0, accessor::get::<Shared>().unwrap().0 .0)
        }))
    });

    let mut scoped = Vec::new();
    let mut singletons = Vec::new();
    for task in tasks {
        let (per_request, shared) = task.await.unwrap().unwrap();
        scoped.push(per_request);
        singletons.push(shared);
    }

    scoped.sort_unstable();
    scoped.dedup();
    assert_eq!(scoped.len(), 16);
    singletons.dedup();
    assert_eq!(singletons.len(), 1);
}

#[tokio::test]
async fn ambient_scope_ends_with_its_future() {
    root();

    assert!(accessor::ambient_scope().is_none());
    let scope = accessor::in_ambient_scope(async { accessor::ambient_scope().unwrap() })
        .await
        .unwrap();

    assert!(scope.is_disposed());
    assert!(accessor::ambient_scope().is_none());
}

#[tokio::test]
async fn flow_carries_the_scope_into_spawned_work() {
    root();

    let scope = accessor::create_scope().unwrap();
    let observed = accessor::with_scope(&scope, async {
        let inner = tokio::spawn(accessor::flow(async {
            accessor::ambient_scope().map(|scope| scope.id())
        }));
        inner.await.unwrap()
    })
    .await;

    assert_eq!(observed, Some(scope.id()));
    scope.dispose();
}

#[test]
fn sideload_in_scope_disposes_the_scope() {
    root();

    let (scope, per_request) = sideload::in_scope(|services| {
        (
            services.scope().cloned().unwrap(),
            sideload::required::<PerRequest>().unwrap().0 .0,
        )
    })
    .unwrap();

    let again = sideload::in_scope(|_| sideload::required::<PerRequest>().unwrap().0 .0).unwrap();
    assert_ne!(per_request, again);
    assert!(scope.is_disposed());
    assert!(sideload::required::<PerRequest>().is_err());
    assert!(sideload::singleton::<Shared>().is_ok());
}

#[test]
fn request_services_prefers_environment_then_items_then_root() {
    let root = root();
    let mut environment = RequestBag::new();
    let mut items = RequestBag::new();

    let resolved = request_services(Some(&environment), Some(&items)).unwrap();
    assert!(resolved.scope().is_none());
    assert!(resolved.root().ptr_eq(&root));

    let item_scope = begin_request_scope(&mut items).unwrap();
    let resolved = request_services(Some(&environment), Some(&items)).unwrap();
    assert!(resolved.scope().unwrap().ptr_eq(&item_scope));

    let environment_scope = begin_request_scope(&mut environment).unwrap();
    let resolved = request_services(Some(&environment), Some(&items)).unwrap();
    assert!(resolved.scope().unwrap().ptr_eq(&environment_scope));

    assert!(end_request_scope(&mut environment));
    assert!(environment_scope.is_disposed());
    assert!(!end_request_scope(&mut environment));
    let resolved = request_services(Some(&environment), Some(&items)).unwrap();
    assert!(resolved.scope().unwrap().ptr_eq(&item_scope));

    end_request_scope(&mut items);
}
