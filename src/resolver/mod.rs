use crate::error::RuntimeError;
use crate::filter::FilterCriteria;
use crate::runtime::{ContainerRuntime, RuntimeResult};
use crate::types::ServerChoice;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum number of autocomplete choices the chat platform accepts
pub const MAX_CHOICES: usize = 25;

/// Maps human-facing server names to runtime IDs using live queries only
#[derive(Clone)]
pub struct NameResolver {
    runtime: Arc<dyn ContainerRuntime>,
    base_filter: FilterCriteria,
}

impl NameResolver {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, base_filter: FilterCriteria) -> Self {
        Self {
            runtime,
            base_filter,
        }
    }

    pub fn base_filter(&self) -> &FilterCriteria {
        &self.base_filter
    }

    /// Autocomplete candidates for a phase. Runtime failures yield no choices.
    pub async fn choices(&self, phase_filter: &FilterCriteria) -> Vec<ServerChoice> {
        let criteria = self.base_filter.merged_with(phase_filter);

        match self.runtime.list(MAX_CHOICES as i64, &criteria).await {
            Ok(containers) => {
                let choices: Vec<_> = containers
                    .iter()
                    .filter_map(ServerChoice::from_summary)
                    .take(MAX_CHOICES)
                    .collect();
                debug!("{} choices for filter {}", choices.len(), criteria);
                choices
            }
            Err(e) => {
                warn!("Autocomplete lookup failed for filter {}: {}", criteria, e);
                Vec::new()
            }
        }
    }

    /// Resolve a submitted argument to a managed container.
    ///
    /// The argument is matched exactly against runtime IDs first, then against
    /// display names. Both lookups include the base filter, so containers
    /// outside the managed fleet never resolve. The daemon reads `name` as a
    /// regex, so an argument it refuses to compile cannot name a server.
    pub async fn resolve(&self, argument: &str) -> RuntimeResult<ServerChoice> {
        let argument = argument.trim();
        if argument.is_empty() {
            return Err(RuntimeError::NotFound {
                id: argument.to_string(),
            });
        }

        let by_id = self.base_filter.merged_with(&FilterCriteria::new().with("id", argument));
        if let Some(choice) = self
            .lookup(&by_id)
            .await?
            .into_iter()
            .find(|choice| choice.id == argument)
        {
            return Ok(choice);
        }

        let by_name =
            self.base_filter.merged_with(&FilterCriteria::new().with("name", argument));
        let candidates = match self.lookup(&by_name).await {
            Err(RuntimeError::Query { reason }) => {
                debug!("Name lookup for {:?} rejected: {}", argument, reason);
                Vec::new()
            }
            other => other?,
        };
        candidates
            .into_iter()
            .find(|choice| choice.name == argument)
            .ok_or_else(|| RuntimeError::NotFound {
                id: argument.to_string(),
            })
    }

    async fn lookup(&self, criteria: &FilterCriteria) -> RuntimeResult<Vec<ServerChoice>> {
        let containers = self.runtime.list(0, criteria).await?;
        Ok(containers
            .iter()
            .filter_map(ServerChoice::from_summary)
            .collect())
    }
}
