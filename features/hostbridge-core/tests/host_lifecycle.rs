use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use hostbridge_core::{
    builder::LegacyHostBuilder,
    config::Configuration,
    di::{Dispose, DynError, Lifetime},
    run::run,
    AddHostedService, CancellationToken, Host, HostBridgeError, HostContext, HostedService,
};

type Journal = Arc<Mutex<Vec<String>>>;

struct Tracking {
    name: &'static str,
    journal: Journal,
    fail_start: bool,
    fail_stop: bool,
}

impl Tracking {
    fn new(name: &'static str, journal: &Journal) -> Self {
        Tracking {
            name,
            journal: journal.clone(),
            fail_start: false,
            fail_stop: false,
        }
    }
}

#[async_trait]
impl HostedService for Tracking {
    fn name(&self) -> &str {
        self.name
    }

    async fn start(&self, _token: &CancellationToken) -> Result<(), DynError> {
        self.journal.lock().unwrap().push(format!("start {}", self.name));
        match self.fail_start {
            true => Err(format!("{} refused to start", self.name).into()),
            false => Ok(()),
        }
    }

    async fn stop(&self, _token: &CancellationToken) -> Result<(), DynError> {
        self.journal.lock().unwrap().push(format!("stop {}", self.name));
        match self.fail_stop {
            true => Err(format!("{} refused to stop", self.name).into()),
            false => Ok(()),
        }
    }
}

struct Resource(Journal);
impl Dispose for Resource {
    fn dispose(&self) {
        self.0.lock().unwrap().push("dispose root".to_string());
    }
}

fn build(services: Vec<Tracking>, journal: &Journal) -> hostbridge_core::LegacyHost {
    let resource_journal = journal.clone();
    LegacyHostBuilder::new()
        .configure_services(move |_, registry| {
            for service in services {
                let service = Mutex::new(Some(service));
                registry.add_hosted_service(move |_| {
                    service
                        .lock()
                        .unwrap()
                        .take()
                        .ok_or_else(|| "constructed twice".into())
                });
            }
            registry.add_disposable(Lifetime::Singleton, move |_| {
                Ok(Arc::new(Resource(resource_journal.clone())))
            });
        })
        .build()
        .unwrap()
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

#[tokio::test]
async fn starts_in_order_and_stops_in_reverse() {
    let journal = Journal::default();
    let host = build(
        vec![
            Tracking::new("a", &journal),
            Tracking::new("b", &journal),
            Tracking::new("c", &journal),
        ],
        &journal,
    );
    let token = CancellationToken::new();

    host.start(&token).await.unwrap();
    host.stop(&token).await.unwrap();

    assert_eq!(
        entries(&journal),
        vec!["start a", "start b", "start c", "stop c", "stop b", "stop a"]
    );
}

#[tokio::test]
async fn start_stops_at_first_failure() {
    let journal = Journal::default();
    let mut failing = Tracking::new("b", &journal);
    failing.fail_start = true;
    let host = build(
        vec![Tracking::new("a", &journal), failing, Tracking::new("c", &journal)],
        &journal,
    );

    let err = host.start(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        HostBridgeError::HostedService { ref service, action: "start", .. } if service == "b"
    ));
    assert_eq!(entries(&journal), vec!["start a", "start b"]);
}

#[tokio::test]
async fn stop_attempts_every_service_and_reports_the_first_failure() {
    let journal = Journal::default();
    let mut c = Tracking::new("c", &journal);
    c.fail_stop = true;
    let mut b = Tracking::new("b", &journal);
    b.fail_stop = true;
    let host = build(vec![Tracking::new("a", &journal), b, c], &journal);

    let err = host.stop(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        HostBridgeError::HostedService { ref service, action: "stop", .. } if service == "c"
    ));
    assert_eq!(entries(&journal), vec!["stop c", "stop b", "stop a"]);
}

#[tokio::test]
async fn context_and_configuration_are_registered() {
    let host = LegacyHostBuilder::new()
        .use_environment("Development")
        .configure_app_configuration(|config| {
            config.add_in_memory([("Greeting", "hello")]);
        })
        .configure_services(|context, registry| {
            assert!(context.is_development());
            let greeting = context.configuration().get("greeting").unwrap_or_default();
            registry.add_instance(greeting.to_string());
        })
        .build()
        .unwrap();

    let root = host.services().unwrap();
    assert_eq!(root.require::<String>().unwrap().as_str(), "hello");
    assert_eq!(
        root.require::<Configuration>().unwrap().get("Greeting"),
        Some("hello")
    );
    assert_eq!(
        root.require::<HostContext>().unwrap().environment_name(),
        "Development"
    );
    assert_eq!(host.context().environment_name(), "Development");
}

#[tokio::test]
async fn dispose_releases_the_container_once() {
    let journal = Journal::default();
    let host = build(vec![], &journal);
    host.services().unwrap().require::<Resource>().unwrap();

    host.dispose();
    host.dispose();

    assert!(host.services().is_none());
    assert_eq!(entries(&journal), vec!["dispose root"]);
}

#[tokio::test]
async fn run_stops_and_disposes_after_cancellation() {
    let journal = Journal::default();
    let host = build(vec![Tracking::new("a", &journal)], &journal);
    host.services().unwrap().require::<Resource>().unwrap();

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    run(&host, token, Some(Duration::from_secs(1))).await.unwrap();

    assert_eq!(entries(&journal), vec!["start a", "stop a", "dispose root"]);
    assert!(host.services().is_none());
}

#[tokio::test]
async fn run_still_stops_and_disposes_when_start_fails() {
    let journal = Journal::default();
    let mut failing = Tracking::new("b", &journal);
    failing.fail_start = true;
    let host = build(vec![Tracking::new("a", &journal), failing], &journal);
    host.services().unwrap().require::<Resource>().unwrap();

    let result = run(&host, CancellationToken::new(), None).await;

    assert!(result.is_err());
    assert_eq!(
        entries(&journal),
        vec!["start a", "start b", "stop b", "stop a", "dispose root"]
    );
}

struct Stubborn(Journal);

#[async_trait]
impl HostedService for Stubborn {
    async fn start(&self, _token: &CancellationToken) -> Result<(), DynError> {
        Ok(())
    }

    async fn stop(&self, token: &CancellationToken) -> Result<(), DynError> {
        token.cancelled().await;
        self.0.lock().unwrap().push("stop observed timeout".to_string());
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_timeout_cancels_the_stop_token() {
    let journal = Journal::default();
    let stubborn_journal = journal.clone();
    let host = LegacyHostBuilder::new()
        .configure_services(move |_, registry| {
            let journal = stubborn_journal.clone();
            registry.add_hosted_service(move |_| Ok(Stubborn(journal.clone())));
        })
        .build()
        .unwrap();

    let token = CancellationToken::cancelled_token();
    run(&host, token, Some(Duration::from_secs(5))).await.unwrap();

    assert_eq!(entries(&journal), vec!["stop observed timeout"]);
}
