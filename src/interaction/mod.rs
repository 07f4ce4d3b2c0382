//! Inbound interaction model
//!
//! Discord delivers both autocomplete queries and command submissions as
//! `INTERACTION_CREATE` events. [`InteractionEnvelope`] mirrors the subset of
//! that payload we use; [`InteractionEnvelope::into_request`] classifies it.

use crate::filter::FilterCriteria;
use crate::types::ServerChoice;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Top-level command group name
pub const COMMAND_NAME: &str = "game-server";
/// Argument carried by every sub-action
pub const SERVER_OPTION: &str = "server-name";

const INTERACTION_APPLICATION_COMMAND: u8 = 2;
const INTERACTION_AUTOCOMPLETE: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubAction {
    Start,
    Stop,
    Restart,
    Status,
}

impl SubAction {
    pub const ALL: [SubAction; 4] = [Self::Start, Self::Stop, Self::Restart, Self::Status];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Status => "status",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
            Self::Restart => "restarted",
            Self::Status => "queried",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Start => "Start a stopped game server",
            Self::Stop => "Stop a running game server",
            Self::Restart => "Restart a running game server",
            Self::Status => "Show the current status of a game server",
        }
    }

    /// Runtime states a container must be in to be offered for this action
    pub fn phase_filter(&self) -> FilterCriteria {
        match self {
            Self::Start => FilterCriteria::new()
                .with("status", "exited")
                .with("status", "paused"),
            Self::Stop | Self::Restart => FilterCriteria::new().with("status", "running"),
            Self::Status => FilterCriteria::new(),
        }
    }
}

impl fmt::Display for SubAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "status" => Ok(Self::Status),
            other => Err(format!("unknown sub-action '{}'", other)),
        }
    }
}

/// Addressing data needed to answer one interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionContext {
    pub id: String,
    pub application_id: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionRequest {
    Autocomplete {
        context: InteractionContext,
        action: SubAction,
        query: String,
    },
    CommandInvocation {
        context: InteractionContext,
        action: SubAction,
        server: String,
    },
}

impl InteractionRequest {
    pub fn context(&self) -> &InteractionContext {
        match self {
            Self::Autocomplete { context, .. } | Self::CommandInvocation { context, .. } => {
                context
            }
        }
    }

    pub fn action(&self) -> SubAction {
        match self {
            Self::Autocomplete { action, .. } | Self::CommandInvocation { action, .. } => *action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionResponse {
    /// Synchronous autocomplete answer
    Immediate(Vec<ServerChoice>),
    /// Placeholder that is later edited with the final text
    Deferred,
}

/// `INTERACTION_CREATE` payload, reduced to the fields we read
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionEnvelope {
    pub id: String,
    pub application_id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub data: Option<CommandData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub focused: bool,
}

impl InteractionEnvelope {
    fn context(&self) -> InteractionContext {
        InteractionContext {
            id: self.id.clone(),
            application_id: self.application_id.clone(),
            token: self.token.clone(),
        }
    }

    /// Classify the payload. Anything we do not understand is logged and
    /// dropped.
    pub fn into_request(self) -> Option<InteractionRequest> {
        let Some(data) = self.data.as_ref() else {
            warn!("Interaction {} carries no command data, ignoring", self.id);
            return None;
        };
        if data.name != COMMAND_NAME {
            warn!("Interaction {} targets unknown command '{}'", self.id, data.name);
            return None;
        }

        let Some(sub) = data.options.first() else {
            warn!("Interaction {} has no sub-command", self.id);
            return None;
        };
        let action = match sub.name.parse::<SubAction>() {
            Ok(action) => action,
            Err(e) => {
                warn!("Interaction {} rejected: {}", self.id, e);
                return None;
            }
        };

        let argument = sub
            .options
            .iter()
            .find(|option| option.name == SERVER_OPTION)
            .and_then(|option| option.value.as_ref())
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();

        match self.kind {
            INTERACTION_AUTOCOMPLETE => Some(InteractionRequest::Autocomplete {
                context: self.context(),
                action,
                query: argument,
            }),
            INTERACTION_APPLICATION_COMMAND => {
                if argument.is_empty() {
                    warn!("Interaction {} is missing '{}'", self.id, SERVER_OPTION);
                    return None;
                }
                Some(InteractionRequest::CommandInvocation {
                    context: self.context(),
                    action,
                    server: argument,
                })
            }
            other => {
                warn!("Interaction {} has unsupported type {}", self.id, other);
                None
            }
        }
    }
}
