//! Dockhand - control containerized game servers from chat
//!
//! Operators start, stop, restart and inspect servers through a Discord slash
//! command group. Server names autocomplete from live runtime state, and
//! commands are acknowledged immediately and answered once the runtime call
//! finishes.

pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod interaction;
pub mod lifecycle;
pub mod monitoring;
pub mod resolver;
pub mod router;
pub mod runtime;
pub mod types;

pub use config::BotConfig;
pub use error::{DockhandError, Result};
pub use filter::FilterCriteria;
pub use types::{ContainerSummary, ServerChoice};

use crate::gateway::InteractionResponder;
use crate::lifecycle::LifecycleOrchestrator;
use crate::resolver::NameResolver;
use crate::router::CommandRouter;
use crate::runtime::ContainerRuntime;
use std::sync::Arc;

/// Re-exports for easier API usage
pub mod api {
    pub use crate::config::{AutoStopConfig, BotConfig, ConfigOverrides};
    pub use crate::filter::FilterCriteria;
    pub use crate::gateway::{
        CommandRegistrar, DiscordRest, GatewayEvent, GatewaySession, InteractionResponder,
    };
    pub use crate::interaction::{InteractionRequest, InteractionResponse, SubAction};
    pub use crate::lifecycle::{LifecycleOrchestrator, Outcome};
    pub use crate::resolver::NameResolver;
    pub use crate::router::{CommandRouter, Delivery};
    pub use crate::runtime::{ContainerRuntime, DockerRuntime};
    pub use crate::{ContainerSummary, Dockhand, ServerChoice};
}

/// Wires a runtime and a chat responder into a ready-to-use router
pub struct Dockhand {
    runtime: Arc<dyn ContainerRuntime>,
    resolver: NameResolver,
    router: Arc<CommandRouter>,
}

impl Dockhand {
    pub fn new(
        base_filter: FilterCriteria,
        runtime: Arc<dyn ContainerRuntime>,
        responder: Arc<dyn InteractionResponder>,
    ) -> Self {
        let resolver = NameResolver::new(Arc::clone(&runtime), base_filter);
        let orchestrator = LifecycleOrchestrator::new(Arc::clone(&runtime), resolver.clone());
        let router = Arc::new(CommandRouter::new(responder, orchestrator));

        Self {
            runtime,
            resolver,
            router,
        }
    }

    pub fn from_config(
        config: &BotConfig,
        runtime: Arc<dyn ContainerRuntime>,
        responder: Arc<dyn InteractionResponder>,
    ) -> Self {
        Self::new(config.base_filter(), runtime, responder)
    }

    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    /// Containers under management, optionally narrowed by `extra`
    pub async fn servers(
        &self,
        limit: i64,
        extra: &FilterCriteria,
    ) -> runtime::RuntimeResult<Vec<ContainerSummary>> {
        let criteria = self.resolver.base_filter().merged_with(extra);
        self.runtime.list(limit, &criteria).await
    }
}
