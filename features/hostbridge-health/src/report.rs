use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::{future::join_all, FutureExt};

use crate::{HealthContributor, HealthResult, HealthStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorReport {
    pub name: String,
    pub result: HealthResult,
}

/// Outcome of asking every contributor once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub contributors: Vec<ContributorReport>,
}

impl HealthReport {
    /// Checks all contributors concurrently.
    ///
    /// A contributor that errors or panics is reported as unhealthy.
    /// Without contributors the report is healthy.
    pub async fn collect(contributors: &[Arc<dyn HealthContributor>]) -> HealthReport {
        let checks = contributors.iter().map(|contributor| async move {
            let result = match AssertUnwindSafe(contributor.check()).catch_unwind().await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    tracing::warn!(contributor = contributor.name(), "Health check failed: {}", e);
                    HealthResult::unhealthy(e.to_string())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(
                        contributor = contributor.name(),
                        "Health check panicked: {}",
                        message
                    );
                    HealthResult::unhealthy(format!("check panicked: {message}"))
                }
            };
            ContributorReport {
                name: contributor.name().to_string(),
                result,
            }
        });

        let contributors = join_all(checks).await;
        let status = contributors
            .iter()
            .map(|report| report.result.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        HealthReport {
            status,
            contributors,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    pub fn get(&self, name: &str) -> Option<&HealthResult> {
        self.contributors
            .iter()
            .find(|report| report.name == name)
            .map(|report| &report.result)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
