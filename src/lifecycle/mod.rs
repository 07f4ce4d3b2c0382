use crate::error::RuntimeError;
use crate::interaction::SubAction;
use crate::resolver::NameResolver;
use crate::runtime::{ContainerRuntime, RuntimeResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub const GENERIC_FAILURE: &str = "Something went wrong";
pub const NOT_FOUND: &str = "Server not found";

/// User-facing result of one sub-action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub action: SubAction,
    pub message: String,
    pub succeeded: bool,
}

impl Outcome {
    fn success(action: SubAction, message: String) -> Self {
        Self {
            action,
            message,
            succeeded: true,
        }
    }

    fn failure(action: SubAction, message: &str) -> Self {
        Self {
            action,
            message: message.to_string(),
            succeeded: false,
        }
    }
}

/// Turns a (sub-action, server) pair into runtime calls and a message.
///
/// Commands against the same container are serialized; different containers
/// proceed concurrently.
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    resolver: NameResolver,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl LifecycleOrchestrator {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, resolver: NameResolver) -> Self {
        Self {
            runtime,
            resolver,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    pub async fn execute(&self, action: SubAction, server: &str) -> Outcome {
        let target = match self.resolver.resolve(server).await {
            Ok(target) => target,
            Err(e) => return Self::failed(action, server, e),
        };

        let lock = self.lock_for(&target.id).await;
        let _guard = lock.lock().await;

        info!("🎮 {} requested for {} ({})", action, target.name, target.id);
        match self.run(action, &target.id).await {
            Ok(message) => {
                info!("✅ {} {}", target.name, action.past_tense());
                Outcome::success(action, message)
            }
            Err(e) => Self::failed(action, &target.id, e),
        }
    }

    async fn run(&self, action: SubAction, id: &str) -> RuntimeResult<String> {
        let runtime = &self.runtime;
        match action {
            SubAction::Start => runtime.start(id).await.map(|_| success_message(action)),
            SubAction::Stop => runtime.stop(id).await.map(|_| success_message(action)),
            SubAction::Restart => runtime.restart(id).await.map(|_| success_message(action)),
            SubAction::Status => runtime.status(id).await.map(|status| status_message(&status)),
        }
    }

    async fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // Drop entries nobody is holding or waiting on
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(id.to_string()).or_default().clone()
    }

    fn failed(action: SubAction, target: &str, e: RuntimeError) -> Outcome {
        if e.is_not_found() {
            warn!("{} for {} failed: {}", action, target, e);
            Outcome::failure(action, NOT_FOUND)
        } else {
            error!("❌ {} for {} failed: {}", action, target, e);
            Outcome::failure(action, GENERIC_FAILURE)
        }
    }
}

pub fn success_message(action: SubAction) -> String {
    format!("Server has been successfully {}", action.past_tense())
}

pub fn status_message(status: &str) -> String {
    format!("Server is currently in status \"{}\"", status)
}
