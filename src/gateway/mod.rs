//! Chat platform boundary
//!
//! The router only talks to the platform through [`InteractionResponder`];
//! command registration goes through [`CommandRegistrar`]. [`DiscordRest`]
//! implements both, [`GatewaySession`] delivers inbound events.

use crate::error::GatewayError;
use crate::interaction::InteractionContext;
use crate::types::ServerChoice;
use async_trait::async_trait;
use serde::Deserialize;

pub mod rest;
pub mod schema;
pub mod session;

pub use rest::DiscordRest;
pub use session::{GatewayEvent, GatewaySession};

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Outbound half of the interaction protocol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    /// Answer an autocomplete query synchronously
    async fn autocomplete(
        &self,
        context: &InteractionContext,
        choices: &[ServerChoice],
    ) -> GatewayResult<()>;

    /// Acknowledge a command; the response is edited later
    async fn defer(&self, context: &InteractionContext) -> GatewayResult<()>;

    /// Replace the deferred placeholder with the final text
    async fn edit_original(&self, context: &InteractionContext, content: &str) -> GatewayResult<()>;

    /// Post an additional message when editing is not possible
    async fn follow_up(&self, context: &InteractionContext, content: &str) -> GatewayResult<()>;
}

/// A command as registered with the platform
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredCommand {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait CommandRegistrar: Send + Sync {
    async fn register(
        &self,
        application_id: &str,
        guild_id: &str,
        command: &serde_json::Value,
    ) -> GatewayResult<RegisteredCommand>;

    async fn deregister(
        &self,
        application_id: &str,
        guild_id: &str,
        command_id: &str,
    ) -> GatewayResult<()>;
}
