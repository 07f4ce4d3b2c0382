//! Interaction state machine
//!
//! ```text
//! Idle -> Dispatched -> Immediate                  (autocomplete)
//!                    -> Deferred -> Edited         (command)
//!                                -> FollowedUp     (edit rejected, or aborted on shutdown)
//! ```
//!
//! Autocomplete is answered inline. Commands are acknowledged inline, then run
//! on their own task so slow runtime calls never hold up event delivery.

use crate::gateway::InteractionResponder;
use crate::interaction::{
    InteractionContext, InteractionEnvelope, InteractionRequest, InteractionResponse, SubAction,
};
use crate::lifecycle::{GENERIC_FAILURE, LifecycleOrchestrator};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// How the terminal response of a command reached the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Edited,
    FollowedUp,
    Undelivered,
}

/// Command tasks plus the interaction each one still owes a response to
#[derive(Default)]
struct InFlight {
    tasks: JoinSet<Delivery>,
    contexts: HashMap<task::Id, InteractionContext>,
}

impl InFlight {
    fn spawn<F>(&mut self, context: InteractionContext, work: F)
    where
        F: Future<Output = Delivery> + Send + 'static,
    {
        let handle = self.tasks.spawn(work);
        self.contexts.insert(handle.id(), context);
    }

    /// Record a finished task. A task that died before answering hands back
    /// its interaction.
    fn settle(
        &mut self,
        finished: Result<(task::Id, Delivery), JoinError>,
    ) -> Result<Delivery, Option<InteractionContext>> {
        match finished {
            Ok((id, delivery)) => {
                self.contexts.remove(&id);
                debug!("Command finished: {:?}", delivery);
                Ok(delivery)
            }
            Err(e) => {
                if e.is_cancelled() {
                    warn!("Command task aborted before answering");
                } else {
                    error!("❌ Command task failed: {}", e);
                }
                Err(self.contexts.remove(&e.id()))
            }
        }
    }
}

pub struct CommandRouter {
    responder: Arc<dyn InteractionResponder>,
    orchestrator: LifecycleOrchestrator,
    in_flight: Mutex<InFlight>,
}

impl CommandRouter {
    pub fn new(
        responder: Arc<dyn InteractionResponder>,
        orchestrator: LifecycleOrchestrator,
    ) -> Self {
        Self {
            responder,
            orchestrator,
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    /// Entry point for raw gateway payloads
    pub async fn handle_envelope(
        &self,
        envelope: InteractionEnvelope,
    ) -> Option<InteractionResponse> {
        let guild = envelope.guild_id.clone().unwrap_or_default();
        match envelope.into_request() {
            Some(request) => Some(self.handle(request).await),
            None => {
                debug!("Dropped interaction from guild {:?}", guild);
                None
            }
        }
    }

    pub async fn handle(&self, request: InteractionRequest) -> InteractionResponse {
        debug!("Interaction {} for {}", request.context().id, request.action());
        match request {
            InteractionRequest::Autocomplete {
                context,
                action,
                query,
            } => {
                debug!("Autocomplete for {} (typed {:?})", action, query);
                let choices = self
                    .orchestrator
                    .resolver()
                    .choices(&action.phase_filter())
                    .await;

                if let Err(e) = self.responder.autocomplete(&context, &choices).await {
                    warn!("Autocomplete response for {} rejected: {}", context.id, e);
                }
                InteractionResponse::Immediate(choices)
            }
            InteractionRequest::CommandInvocation {
                context,
                action,
                server,
            } => {
                self.dispatch_command(context, action, server).await;
                InteractionResponse::Deferred
            }
        }
    }

    async fn dispatch_command(
        &self,
        context: InteractionContext,
        action: SubAction,
        server: String,
    ) {
        let responder = Arc::clone(&self.responder);
        let acknowledged = self.responder.defer(&context).await;

        let mut in_flight = self.in_flight.lock().await;
        while let Some(finished) = in_flight.tasks.try_join_next_with_id() {
            if let Err(Some(orphan)) = in_flight.settle(finished) {
                let responder = Arc::clone(&responder);
                in_flight.spawn(orphan.clone(), async move {
                    follow_up(responder.as_ref(), &orphan, GENERIC_FAILURE).await
                });
            }
        }

        if let Err(e) = acknowledged {
            error!("Deferred acknowledgment for {} rejected: {}", context.id, e);
            let task_context = context.clone();
            in_flight.spawn(context, async move {
                follow_up(responder.as_ref(), &task_context, GENERIC_FAILURE).await
            });
            return;
        }

        info!("⏳ {} {} dispatched ({})", action, server, context.id);
        let orchestrator = self.orchestrator.clone();
        let task_context = context.clone();
        in_flight.spawn(context, async move {
            let outcome = orchestrator.execute(action, &server).await;
            deliver(responder.as_ref(), &task_context, &outcome.message).await
        });
    }

    /// Number of commands still running or waiting to be reaped
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.tasks.len()
    }

    /// Wait for in-flight commands to deliver their result. Whatever is left
    /// after `grace` is aborted and answered with a generic failure.
    pub async fn drain(&self, grace: Duration) -> Vec<Delivery> {
        let mut in_flight = std::mem::take(&mut *self.in_flight.lock().await);
        if in_flight.tasks.is_empty() {
            return Vec::new();
        }

        info!("⏳ Waiting for {} in-flight command(s)", in_flight.tasks.len());
        let mut deliveries = Vec::new();
        let mut orphans = Vec::new();
        let drained = tokio::time::timeout(grace, async {
            while let Some(finished) = in_flight.tasks.join_next_with_id().await {
                match in_flight.settle(finished) {
                    Ok(delivery) => deliveries.push(delivery),
                    Err(orphan) => orphans.extend(orphan),
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                "{} command(s) still running after {:?}, aborting",
                in_flight.tasks.len(),
                grace
            );
            in_flight.tasks.abort_all();
            while let Some(finished) = in_flight.tasks.join_next_with_id().await {
                match in_flight.settle(finished) {
                    Ok(delivery) => deliveries.push(delivery),
                    Err(orphan) => orphans.extend(orphan),
                }
            }
        }

        for orphan in orphans {
            deliveries.push(follow_up(self.responder.as_ref(), &orphan, GENERIC_FAILURE).await);
        }
        deliveries
    }
}

/// Edit the deferred response; fall back to a follow-up if the edit is rejected
async fn deliver(
    responder: &dyn InteractionResponder,
    context: &InteractionContext,
    message: &str,
) -> Delivery {
    match responder.edit_original(context, message).await {
        Ok(()) => {
            debug!("Edited response for {}", context.id);
            Delivery::Edited
        }
        Err(e) => {
            warn!("Edit for {} rejected, posting follow-up: {}", context.id, e);
            follow_up(responder, context, message).await
        }
    }
}

async fn follow_up(
    responder: &dyn InteractionResponder,
    context: &InteractionContext,
    message: &str,
) -> Delivery {
    match responder.follow_up(context, message).await {
        Ok(()) => Delivery::FollowedUp,
        Err(e) => {
            error!("Follow-up for {} rejected, giving up: {}", context.id, e);
            Delivery::Undelivered
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, RuntimeError};
    use crate::filter::FilterCriteria;
    use crate::gateway::MockInteractionResponder;
    use crate::resolver::NameResolver;
    use crate::runtime::{ContainerRuntime, RuntimeResult};
    use crate::types::ContainerSummary;
    use async_trait::async_trait;

    /// One running container; stopping it always fails
    struct OneServer;

    #[async_trait]
    impl ContainerRuntime for OneServer {
        async fn list(
            &self,
            _limit: i64,
            criteria: &FilterCriteria,
        ) -> RuntimeResult<Vec<ContainerSummary>> {
            let server = ContainerSummary {
                id: "c0ffee".to_string(),
                names: vec!["/valheim".to_string()],
                status: "Up 2 hours".to_string(),
                state: Some("running".to_string()),
            };
            let wanted = |key: &str, value: &str| {
                criteria.values(key).is_none_or(|values| values.contains(value))
            };
            if wanted("id", &server.id) && wanted("name", "valheim") && wanted("status", "running")
            {
                Ok(vec![server])
            } else {
                Ok(vec![])
            }
        }

        async fn start(&self, _id: &str) -> RuntimeResult<()> {
            Ok(())
        }

        async fn stop(&self, id: &str) -> RuntimeResult<()> {
            Err(RuntimeError::operation(id, "stop", "daemon said no"))
        }
    }

    fn context() -> InteractionContext {
        InteractionContext {
            id: "1".to_string(),
            application_id: "42".to_string(),
            token: "tok".to_string(),
        }
    }

    fn router(responder: MockInteractionResponder) -> CommandRouter {
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(OneServer);
        let resolver = NameResolver::new(Arc::clone(&runtime), FilterCriteria::new());
        CommandRouter::new(Arc::new(responder), LifecycleOrchestrator::new(runtime, resolver))
    }

    fn command(action: SubAction) -> InteractionRequest {
        InteractionRequest::CommandInvocation {
            context: context(),
            action,
            server: "c0ffee".to_string(),
        }
    }

    fn rejected(operation: &'static str) -> GatewayError {
        GatewayError::ResponseDelivery {
            operation,
            reason: "401 Unauthorized".to_string(),
        }
    }

    #[tokio::test]
    async fn test_command_is_deferred_then_edited_once() {
        let mut responder = MockInteractionResponder::new();
        responder.expect_defer().times(1).returning(|_| Ok(()));
        responder
            .expect_edit_original()
            .withf(|ctx, content| {
                ctx.id == "1" && content.to_string() == "Server has been successfully started"
            })
            .times(1)
            .returning(|_, _| Ok(()));
        responder.expect_follow_up().never();

        let router = router(responder);
        let response = router.handle(command(SubAction::Start)).await;

        assert_eq!(response, InteractionResponse::Deferred);
        assert_eq!(router.drain(Duration::from_secs(5)).await, vec![Delivery::Edited]);
        assert_eq!(router.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_runtime_failure_is_reported_generically() {
        let mut responder = MockInteractionResponder::new();
        responder.expect_defer().returning(|_| Ok(()));
        responder
            .expect_edit_original()
            .withf(|_, content| content.to_string() == "Something went wrong")
            .times(1)
            .returning(|_, _| Ok(()));

        let router = router(responder);
        router.handle(command(SubAction::Stop)).await;
        assert_eq!(router.drain(Duration::from_secs(5)).await, vec![Delivery::Edited]);
    }

    #[tokio::test]
    async fn test_rejected_edit_falls_back_to_follow_up() {
        let mut responder = MockInteractionResponder::new();
        responder.expect_defer().returning(|_| Ok(()));
        responder
            .expect_edit_original()
            .times(1)
            .returning(|_, _| Err(rejected("response edit")));
        responder
            .expect_follow_up()
            .withf(|_, content| {
                content.to_string() == "Server is currently in status \"Up 2 hours\""
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let router = router(responder);
        router.handle(command(SubAction::Status)).await;
        assert_eq!(router.drain(Duration::from_secs(5)).await, vec![Delivery::FollowedUp]);
    }

    #[tokio::test]
    async fn test_failed_follow_up_is_not_retried() {
        let mut responder = MockInteractionResponder::new();
        responder.expect_defer().returning(|_| Ok(()));
        responder
            .expect_edit_original()
            .times(1)
            .returning(|_, _| Err(rejected("response edit")));
        responder
            .expect_follow_up()
            .times(1)
            .returning(|_, _| Err(rejected("follow-up message")));

        let router = router(responder);
        router.handle(command(SubAction::Start)).await;
        assert_eq!(router.drain(Duration::from_secs(5)).await, vec![Delivery::Undelivered]);
    }

    #[tokio::test]
    async fn test_rejected_ack_skips_the_operation() {
        let mut responder = MockInteractionResponder::new();
        responder
            .expect_defer()
            .times(1)
            .returning(|_| Err(rejected("deferred acknowledgment")));
        responder.expect_edit_original().never();
        responder
            .expect_follow_up()
            .withf(|_, content| content.to_string() == "Something went wrong")
            .times(1)
            .returning(|_, _| Ok(()));

        let router = router(responder);
        router.handle(command(SubAction::Start)).await;
        assert_eq!(router.drain(Duration::from_secs(5)).await, vec![Delivery::FollowedUp]);
    }

    #[tokio::test]
    async fn test_autocomplete_is_answered_inline() {
        let mut responder = MockInteractionResponder::new();
        responder
            .expect_autocomplete()
            .withf(|_, choices| choices.len() == 1 && choices[0].name == "valheim")
            .times(1)
            .returning(|_, _| Ok(()));
        responder.expect_defer().never();

        let router = router(responder);
        let response = router
            .handle(InteractionRequest::Autocomplete {
                context: context(),
                action: SubAction::Stop,
                query: String::new(),
            })
            .await;

        match response {
            InteractionResponse::Immediate(choices) => assert_eq!(choices[0].id, "c0ffee"),
            other => panic!("expected immediate response, got {:?}", other),
        }
        assert_eq!(router.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_autocomplete_for_start_hides_running_servers() {
        let mut responder = MockInteractionResponder::new();
        responder
            .expect_autocomplete()
            .withf(|_, choices| choices.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));

        let router = router(responder);
        let response = router
            .handle(InteractionRequest::Autocomplete {
                context: context(),
                action: SubAction::Start,
                query: "val".to_string(),
            })
            .await;
        assert_eq!(response, InteractionResponse::Immediate(vec![]));
    }
}
