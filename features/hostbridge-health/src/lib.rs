//! Health primitives: contributors report a [HealthResult], a [HealthReport] aggregates them
//! to the worst status.

mod report;
mod service;

pub use report::{ContributorReport, HealthReport};
pub use service::HealthService;

use async_trait::async_trait;
use hostbridge_di::DynError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Unhealthy => "Unhealthy",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthResult {
    pub status: HealthStatus,
    pub description: Option<String>,
}

impl HealthResult {
    pub fn healthy() -> Self {
        HealthResult {
            status: HealthStatus::Healthy,
            description: None,
        }
    }

    pub fn degraded(description: impl Into<String>) -> Self {
        HealthResult {
            status: HealthStatus::Degraded,
            description: Some(description.into()),
        }
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        HealthResult {
            status: HealthStatus::Unhealthy,
            description: Some(description.into()),
        }
    }
}

/// Something that can tell whether a part of the application works.
///
/// Register implementations as `dyn HealthContributor` to have them picked up by
/// [HealthService::from_services].
#[async_trait]
pub trait HealthContributor: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> Result<HealthResult, DynError>;
}
