use super::{CommandRegistrar, GatewayResult, InteractionResponder, RegisteredCommand};
use crate::error::GatewayError;
use crate::interaction::InteractionContext;
use crate::types::ServerChoice;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const CALLBACK_DEFERRED_MESSAGE: u8 = 5;
const CALLBACK_AUTOCOMPLETE_RESULT: u8 = 8;
/// Discord truncates choice names and values at 100 characters
const CHOICE_FIELD_LIMIT: usize = 100;

/// Discord REST client for interaction callbacks and command registration
#[derive(Clone)]
pub struct DiscordRest {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CurrentApplication {
    id: String,
    name: String,
}

impl DiscordRest {
    pub fn new(token: impl Into<String>) -> GatewayResult<Self> {
        Self::with_base_url(token, DEFAULT_API_BASE)
    }

    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                "DiscordBot (https://github.com/CK-Technology/dockhand, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()
            .map_err(|e| GatewayError::Connection {
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Application ID of the bot, needed for command registration
    pub async fn application_id(&self) -> GatewayResult<String> {
        let response = self
            .send(
                "fetch application",
                self.request(Method::GET, "/oauth2/applications/@me"),
            )
            .await?;
        let application: CurrentApplication = response.json().await.map_err(|e| {
            GatewayError::Protocol {
                reason: format!("malformed application payload: {}", e),
            }
        })?;
        info!("🤖 Running as application {} ({})", application.name, application.id);
        Ok(application.id)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> GatewayResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::ResponseDelivery {
                operation,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!("{} -> {}", operation, status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::ResponseDelivery {
            operation,
            reason: format!("{}: {}", status, body),
        })
    }

    async fn callback(
        &self,
        context: &InteractionContext,
        operation: &'static str,
        body: Value,
    ) -> GatewayResult<()> {
        let path = format!("/interactions/{}/{}/callback", context.id, context.token);
        self.send(operation, self.request(Method::POST, &path).json(&body))
            .await
            .map(|_| ())
    }
}

fn truncate(value: &str) -> String {
    value.chars().take(CHOICE_FIELD_LIMIT).collect()
}

pub(crate) fn autocomplete_body(choices: &[ServerChoice]) -> Value {
    let choices: Vec<Value> = choices
        .iter()
        .map(|choice| json!({ "name": truncate(&choice.name), "value": truncate(&choice.id) }))
        .collect();
    json!({
        "type": CALLBACK_AUTOCOMPLETE_RESULT,
        "data": { "choices": choices }
    })
}

#[async_trait]
impl InteractionResponder for DiscordRest {
    async fn autocomplete(
        &self,
        context: &InteractionContext,
        choices: &[ServerChoice],
    ) -> GatewayResult<()> {
        self.callback(context, "autocomplete response", autocomplete_body(choices))
            .await
    }

    async fn defer(&self, context: &InteractionContext) -> GatewayResult<()> {
        self.callback(
            context,
            "deferred acknowledgment",
            json!({ "type": CALLBACK_DEFERRED_MESSAGE }),
        )
        .await
    }

    async fn edit_original(
        &self,
        context: &InteractionContext,
        content: &str,
    ) -> GatewayResult<()> {
        let path = format!(
            "/webhooks/{}/{}/messages/@original",
            context.application_id, context.token
        );
        self.send(
            "response edit",
            self.request(Method::PATCH, &path)
                .json(&json!({ "content": content })),
        )
        .await
        .map(|_| ())
    }

    async fn follow_up(
        &self,
        context: &InteractionContext,
        content: &str,
    ) -> GatewayResult<()> {
        let path = format!("/webhooks/{}/{}", context.application_id, context.token);
        self.send(
            "follow-up message",
            self.request(Method::POST, &path)
                .json(&json!({ "content": content })),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl CommandRegistrar for DiscordRest {
    async fn register(
        &self,
        application_id: &str,
        guild_id: &str,
        command: &Value,
    ) -> GatewayResult<RegisteredCommand> {
        let path = format!("/applications/{}/guilds/{}/commands", application_id, guild_id);
        let response = self
            .send("command registration", self.request(Method::POST, &path).json(command))
            .await?;
        response.json().await.map_err(|e| GatewayError::Protocol {
            reason: format!("malformed command payload: {}", e),
        })
    }

    async fn deregister(
        &self,
        application_id: &str,
        guild_id: &str,
        command_id: &str,
    ) -> GatewayResult<()> {
        let path = format!(
            "/applications/{}/guilds/{}/commands/{}",
            application_id, guild_id, command_id
        );
        self.send("command removal", self.request(Method::DELETE, &path))
            .await
            .map(|_| ())
    }
}
