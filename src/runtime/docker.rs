use super::{ContainerRuntime, RuntimeResult};
use crate::error::RuntimeError;
use crate::filter::FilterCriteria;
use crate::types::ContainerSummary;
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{ListContainersOptions, StartContainerOptions, StopContainerOptions};
use bollard::errors::Error as BollardError;
use bollard::models::ContainerSummary as DockerContainerSummary;
use tracing::{debug, error, info};

/// Docker Engine implementation of [`ContainerRuntime`]
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform's default socket
    pub async fn connect() -> RuntimeResult<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(unavailable)?;
        let runtime = Self { docker };
        runtime.ping().await?;
        Ok(runtime)
    }

    pub async fn ping(&self) -> RuntimeResult<()> {
        let version = self.docker.version().await.map_err(unavailable)?;
        info!(
            "🐳 Connected to Docker {} (API {})",
            version.version.as_deref().unwrap_or("unknown"),
            version.api_version.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }

    /// Release the client. Pending requests already hold their own handle.
    pub fn close(self) {
        debug!("Closing Docker client");
        drop(self.docker);
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list(
        &self,
        limit: i64,
        criteria: &FilterCriteria,
    ) -> RuntimeResult<Vec<ContainerSummary>> {
        let options = ListContainersOptions::<String> {
            all: true,
            limit: (limit > 0).then_some(limit as isize),
            filters: criteria.to_docker_filters(),
            ..Default::default()
        };

        debug!("Listing containers (limit: {}, filter: {})", limit, criteria);
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| {
                error!("Unable to list containers with filter {}: {}", criteria, e);
                classify_query_error(e)
            })?;

        Ok(containers.into_iter().filter_map(summary_from_docker).collect())
    }

    async fn start(&self, id: &str) -> RuntimeResult<()> {
        info!("▶️  Starting container: {}", id);
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| {
                error!("Unable to start container {}: {}", id, e);
                RuntimeError::operation(id, "start", e)
            })
    }

    async fn stop(&self, id: &str) -> RuntimeResult<()> {
        info!("🛑 Stopping container: {}", id);
        self.docker
            .stop_container(id, None::<StopContainerOptions>)
            .await
            .map_err(|e| {
                error!("Unable to stop container {}: {}", id, e);
                RuntimeError::operation(id, "stop", e)
            })
    }
}

fn summary_from_docker(container: DockerContainerSummary) -> Option<ContainerSummary> {
    Some(ContainerSummary {
        id: container.id?,
        names: container.names.unwrap_or_default(),
        status: container.status.unwrap_or_default(),
        state: container.state,
    })
}

fn unavailable(e: BollardError) -> RuntimeError {
    RuntimeError::Unavailable {
        reason: e.to_string(),
    }
}

/// Docker answers malformed filters with a 4xx; anything else is a transport
/// or daemon problem.
fn classify_query_error(e: BollardError) -> RuntimeError {
    match e {
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } if (400..500).contains(&status_code) => RuntimeError::Query { reason: message },
        other => unavailable(other),
    }
}
