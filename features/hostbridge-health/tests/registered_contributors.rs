use std::sync::Arc;

use async_trait::async_trait;
use hostbridge_di::{DynError, ServiceRegistry};
use hostbridge_health::{HealthContributor, HealthResult, HealthService, HealthStatus};

struct Disk;

#[async_trait]
impl HealthContributor for Disk {
    fn name(&self) -> &str {
        "disk"
    }

    async fn check(&self) -> Result<HealthResult, DynError> {
        Ok(HealthResult::healthy())
    }
}

struct Queue;

#[async_trait]
impl HealthContributor for Queue {
    fn name(&self) -> &str {
        "queue"
    }

    async fn check(&self) -> Result<HealthResult, DynError> {
        Ok(HealthResult::degraded("backlog above 1000"))
    }
}

#[tokio::test]
async fn service_checks_every_registered_contributor() {
    let mut registry = ServiceRegistry::new();
    registry
        .add_singleton::<dyn HealthContributor, _>(|_| Ok(Arc::new(Disk)))
        .add_singleton::<dyn HealthContributor, _>(|_| Ok(Arc::new(Queue)));
    let container = registry.build();

    let health = HealthService::from_services(&container.services()).unwrap();
    assert_eq!(health.contributors().len(), 2);

    let report = health.check_health().await;
    assert_eq!(report.status, HealthStatus::Degraded);
    let names: Vec<_> = report.contributors.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["disk", "queue"]);
}
