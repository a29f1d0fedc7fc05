use std::{ops::Deref, sync::Arc};

use hostbridge_di::{RequireError, Services};

use crate::{HealthContributor, HealthReport};

/// The set of contributors checked together, cheap to clone
#[derive(Clone, Default)]
pub struct HealthService(Arc<HealthServiceInner>);

#[derive(Default)]
pub struct HealthServiceInner {
    contributors: Vec<Arc<dyn HealthContributor>>,
}

impl Deref for HealthService {
    type Target = HealthServiceInner;
    fn deref(&self) -> &HealthServiceInner {
        &self.0
    }
}

impl HealthService {
    pub fn new(contributors: Vec<Arc<dyn HealthContributor>>) -> Self {
        HealthService(Arc::new(HealthServiceInner { contributors }))
    }

    /// Collects every registered `dyn HealthContributor`
    pub fn from_services(services: &Services) -> Result<Self, RequireError> {
        Ok(Self::new(services.require_all::<dyn HealthContributor>()?))
    }
}

impl HealthServiceInner {
    pub fn contributors(&self) -> &[Arc<dyn HealthContributor>] {
        &self.contributors
    }

    pub async fn check_health(&self) -> HealthReport {
        let report = HealthReport::collect(&self.contributors).await;
        tracing::debug!(status = %report.status, "Health checked");
        report
    }
}
