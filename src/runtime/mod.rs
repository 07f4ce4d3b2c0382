use crate::error::RuntimeError;
use crate::filter::FilterCriteria;
use crate::types::ContainerSummary;
use async_trait::async_trait;
use tracing::warn;

pub mod docker;

pub use docker::DockerRuntime;

pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

/// Lifecycle operations against the container runtime.
///
/// Implementations hold no state between calls and must be safe to share
/// across tasks.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List containers matching `criteria`. A `limit` of zero or less leaves
    /// the bound to the runtime.
    async fn list(
        &self,
        limit: i64,
        criteria: &FilterCriteria,
    ) -> RuntimeResult<Vec<ContainerSummary>>;

    async fn start(&self, id: &str) -> RuntimeResult<()>;

    async fn stop(&self, id: &str) -> RuntimeResult<()>;

    /// Status text of a single container, `NotFound` if it no longer exists
    async fn status(&self, id: &str) -> RuntimeResult<String> {
        let criteria = FilterCriteria::new().with("id", id);
        let containers = self.list(1, &criteria).await?;
        containers
            .into_iter()
            .next()
            .map(|container| container.status)
            .ok_or_else(|| RuntimeError::NotFound { id: id.to_string() })
    }

    /// Stop then start. `start` always runs; its result is the one returned,
    /// a `stop` failure is only logged.
    async fn restart(&self, id: &str) -> RuntimeResult<()> {
        if let Err(e) = self.stop(id).await {
            warn!("Stop failed during restart of {}, starting anyway: {}", id, e);
        }
        self.start(id).await
    }
}
