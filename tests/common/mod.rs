#![allow(dead_code)]

use async_trait::async_trait;
use dockhand::error::{GatewayError, RuntimeError};
use dockhand::gateway::{GatewayResult, InteractionResponder};
use dockhand::interaction::{InteractionContext, InteractionRequest, SubAction};
use dockhand::runtime::{ContainerRuntime, RuntimeResult};
use dockhand::{ContainerSummary, FilterCriteria, ServerChoice};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    List(i64, String),
    Start(String),
    Stop(String),
}

/// In-memory runtime that filters like the Docker daemon and records calls
#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<Vec<ContainerSummary>>,
    calls: Mutex<Vec<RuntimeCall>>,
    fail_list: bool,
    fail_start: bool,
    fail_stop: bool,
    reject_names: bool,
    ignore_limit: bool,
    start_delay: Option<Duration>,
}

impl FakeRuntime {
    pub fn with_containers(containers: Vec<ContainerSummary>) -> Self {
        Self {
            containers: Mutex::new(containers),
            ..Default::default()
        }
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Reject `name` filters the way the daemon rejects a bad regex
    pub fn rejecting_name_queries(mut self) -> Self {
        self.reject_names = true;
        self
    }

    /// Return every match regardless of the requested limit
    pub fn ignoring_limit(mut self) -> Self {
        self.ignore_limit = true;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than `List`
    pub fn operations(&self) -> Vec<RuntimeCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, RuntimeCall::List(..)))
            .collect()
    }

    pub fn state_of(&self, id: &str) -> Option<String> {
        self.containers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.state.clone())
    }

    fn set_state(&self, id: &str, state: &str, status: &str) {
        let mut containers = self.containers.lock().unwrap();
        if let Some(container) = containers.iter_mut().find(|c| c.id == id) {
            container.state = Some(state.to_string());
            container.status = status.to_string();
        }
    }

    fn record(&self, call: RuntimeCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn matches(container: &ContainerSummary, criteria: &FilterCriteria) -> bool {
    let check = |key: &str, test: &dyn Fn(&str) -> bool| {
        criteria
            .values(key)
            .is_none_or(|values| values.iter().any(|value| test(value)))
    };

    check("id", &|value| container.id.starts_with(value))
        && check("name", &|value| {
            container.names.iter().any(|name| name.contains(value))
        })
        && check("status", &|value| container.state.as_deref() == Some(value))
        && check("label", &|_| true)
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list(
        &self,
        limit: i64,
        criteria: &FilterCriteria,
    ) -> RuntimeResult<Vec<ContainerSummary>> {
        self.record(RuntimeCall::List(limit, criteria.to_string()));
        if self.fail_list {
            return Err(RuntimeError::Unavailable {
                reason: "connection refused".to_string(),
            });
        }
        if self.reject_names && criteria.values("name").is_some() {
            return Err(RuntimeError::Query {
                reason: "error parsing regexp: missing closing )".to_string(),
            });
        }

        let containers = self.containers.lock().unwrap();
        let mut found: Vec<_> = containers
            .iter()
            .filter(|container| matches(container, criteria))
            .cloned()
            .collect();
        if limit > 0 && !self.ignore_limit {
            found.truncate(limit as usize);
        }
        Ok(found)
    }

    async fn start(&self, id: &str) -> RuntimeResult<()> {
        self.record(RuntimeCall::Start(id.to_string()));
        if self.fail_start {
            return Err(RuntimeError::operation(id, "start", "port already allocated"));
        }
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        self.set_state(id, "running", "Up Less than a second");
        Ok(())
    }

    async fn stop(&self, id: &str) -> RuntimeResult<()> {
        self.record(RuntimeCall::Stop(id.to_string()));
        if self.fail_stop {
            return Err(RuntimeError::operation(id, "stop", "container is not running"));
        }
        self.set_state(id, "exited", "Exited (0) Less than a second ago");
        Ok(())
    }
}

pub fn container(id: &str, name: &str, state: &str, status: &str) -> ContainerSummary {
    ContainerSummary {
        id: id.to_string(),
        names: vec![format!("/{}", name)],
        status: status.to_string(),
        state: Some(state.to_string()),
    }
}

/// `/alpha` running, `/beta` exited
pub fn alpha_beta() -> Vec<ContainerSummary> {
    vec![
        container("a1a1a1", "alpha", "running", "Up 3 hours"),
        container("b2b2b2", "beta", "exited", "Exited (0) 2 days ago"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Autocomplete(Vec<ServerChoice>),
    Defer,
    Edit(String),
    FollowUp(String),
}

/// Responder that records every reply, optionally rejecting some of them
#[derive(Default)]
pub struct RecordingResponder {
    replies: Mutex<Vec<Reply>>,
    reject_defer: bool,
    reject_edit: bool,
    reject_follow_up: bool,
}

impl RecordingResponder {
    pub fn rejecting_defer(mut self) -> Self {
        self.reject_defer = true;
        self
    }

    pub fn rejecting_edit(mut self) -> Self {
        self.reject_edit = true;
        self
    }

    pub fn rejecting_follow_up(mut self) -> Self {
        self.reject_follow_up = true;
        self
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().unwrap().clone()
    }

    /// Edits and follow-ups, i.e. terminal responses
    pub fn terminal(&self) -> Vec<Reply> {
        self.replies()
            .into_iter()
            .filter(|reply| matches!(reply, Reply::Edit(_) | Reply::FollowUp(_)))
            .collect()
    }

    fn push(&self, reply: Reply, reject: bool, operation: &'static str) -> GatewayResult<()> {
        self.replies.lock().unwrap().push(reply);
        if reject {
            Err(GatewayError::ResponseDelivery {
                operation,
                reason: "404 Unknown interaction".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl InteractionResponder for RecordingResponder {
    async fn autocomplete(
        &self,
        _context: &InteractionContext,
        choices: &[ServerChoice],
    ) -> GatewayResult<()> {
        self.push(
            Reply::Autocomplete(choices.to_vec()),
            false,
            "autocomplete response",
        )
    }

    async fn defer(&self, _context: &InteractionContext) -> GatewayResult<()> {
        self.push(Reply::Defer, self.reject_defer, "deferred acknowledgment")
    }

    async fn edit_original(
        &self,
        _context: &InteractionContext,
        content: &str,
    ) -> GatewayResult<()> {
        self.push(Reply::Edit(content.to_string()), self.reject_edit, "response edit")
    }

    async fn follow_up(
        &self,
        _context: &InteractionContext,
        content: &str,
    ) -> GatewayResult<()> {
        self.push(
            Reply::FollowUp(content.to_string()),
            self.reject_follow_up,
            "follow-up message",
        )
    }
}

pub fn context(id: &str) -> InteractionContext {
    InteractionContext {
        id: id.to_string(),
        application_id: "42".to_string(),
        token: format!("token-{}", id),
    }
}

pub fn autocomplete(action: SubAction) -> InteractionRequest {
    InteractionRequest::Autocomplete {
        context: context("ac"),
        action,
        query: String::new(),
    }
}

pub fn command(action: SubAction, server: &str) -> InteractionRequest {
    InteractionRequest::CommandInvocation {
        context: context("cmd"),
        action,
        server: server.to_string(),
    }
}
