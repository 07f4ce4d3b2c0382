//! Discord gateway websocket session
//!
//! Only the parts needed to receive interactions: hello, identify, heartbeat
//! and dispatch. Sessions are not resumed; a dropped connection identifies
//! again after a short backoff.

use super::GatewayResult;
use crate::error::GatewayError;
use crate::interaction::InteractionEnvelope;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval, sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_BUFFER: usize = 64;

/// Events surfaced to the bot
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready {
        application_id: String,
        username: String,
    },
    Interaction(InteractionEnvelope),
}

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadyData {
    user: ReadyUser,
    application: ReadyApplication,
}

#[derive(Debug, Deserialize)]
struct ReadyUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct ReadyApplication {
    id: String,
}

/// Why a single connection ended
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Reconnect,
}

/// Handle to the background gateway connection
pub struct GatewaySession {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl GatewaySession {
    /// Open the session in the background and return the event stream
    pub fn connect(token: impl Into<String>) -> (Self, mpsc::Receiver<GatewayEvent>) {
        Self::connect_to(token, DEFAULT_GATEWAY_URL)
    }

    pub fn connect_to(
        token: impl Into<String>,
        url: impl Into<String>,
    ) -> (Self, mpsc::Receiver<GatewayEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(token.into(), url.into(), events_tx, shutdown_rx));
        (Self { shutdown, task }, events_rx)
    }

    /// Send a close frame and wait briefly for the connection task to finish
    pub async fn close(self) {
        info!("🔌 Closing gateway session");
        let _ = self.shutdown.send(true);

        let mut task = self.task;
        if timeout(CLOSE_TIMEOUT, &mut task).await.is_err() {
            warn!("Gateway did not close in time, aborting");
            task.abort();
        }
    }
}

async fn run(
    token: String,
    url: String,
    events: mpsc::Sender<GatewayEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        match connect_once(&token, &url, &events, &mut shutdown).await {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::Reconnect) => info!("🔄 Gateway asked us to reconnect"),
            Err(e) => error!("Gateway session ended: {}", e),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(RECONNECT_BACKOFF) => {}
        }
    }
    debug!("Gateway task finished");
}

async fn connect_once(
    token: &str,
    url: &str,
    events: &mpsc::Sender<GatewayEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> GatewayResult<SessionEnd> {
    let (stream, _response) = connect_async(url).await.map_err(connection_error)?;
    let (mut write, mut read) = stream.split();

    let heartbeat_ms = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => {
                let payload = decode(&text)?;
                if payload.op != OP_HELLO {
                    return Err(GatewayError::Protocol {
                        reason: format!("expected hello, got op {}", payload.op),
                    });
                }
                break payload.d["heartbeat_interval"].as_u64().ok_or_else(|| {
                    GatewayError::Protocol {
                        reason: "hello without heartbeat_interval".to_string(),
                    }
                })?;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(connection_error(e)),
            None => {
                return Err(GatewayError::Connection {
                    reason: "closed before hello".to_string(),
                });
            }
        }
    };

    write
        .send(Message::Text(identify_payload(token).to_string()))
        .await
        .map_err(connection_error)?;
    debug!("Identified, heartbeat every {}ms", heartbeat_ms);

    let mut sequence: Option<u64> = None;
    let mut heartbeat = interval(Duration::from_millis(heartbeat_ms));
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(SessionEnd::Shutdown);
            }
            _ = heartbeat.tick() => {
                write
                    .send(Message::Text(heartbeat_payload(sequence).to_string()))
                    .await
                    .map_err(connection_error)?;
            }
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => {
                        warn!("Gateway closed the connection: {:?}", frame);
                        return Ok(SessionEnd::Reconnect);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(connection_error(e)),
                    None => return Ok(SessionEnd::Reconnect),
                };

                let payload = decode(&text)?;
                if let Some(seq) = payload.s {
                    sequence = Some(seq);
                }

                match payload.op {
                    OP_DISPATCH => {
                        if let Some(event) = dispatch_event(payload.t.as_deref(), payload.d) {
                            if events.send(event).await.is_err() {
                                debug!("Event receiver dropped, closing gateway");
                                let _ = write.send(Message::Close(None)).await;
                                return Ok(SessionEnd::Shutdown);
                            }
                        }
                    }
                    OP_HEARTBEAT => {
                        write
                            .send(Message::Text(heartbeat_payload(sequence).to_string()))
                            .await
                            .map_err(connection_error)?;
                    }
                    OP_RECONNECT | OP_INVALID_SESSION => return Ok(SessionEnd::Reconnect),
                    OP_HEARTBEAT_ACK => {}
                    other => debug!("Ignoring gateway op {}", other),
                }
            }
        }
    }
}

fn dispatch_event(kind: Option<&str>, data: Value) -> Option<GatewayEvent> {
    match kind? {
        "READY" => match serde_json::from_value::<ReadyData>(data) {
            Ok(ready) => Some(GatewayEvent::Ready {
                application_id: ready.application.id,
                username: ready.user.username,
            }),
            Err(e) => {
                warn!("Malformed READY payload: {}", e);
                None
            }
        },
        "INTERACTION_CREATE" => match serde_json::from_value::<InteractionEnvelope>(data) {
            Ok(envelope) => Some(GatewayEvent::Interaction(envelope)),
            Err(e) => {
                warn!("Malformed interaction payload: {}", e);
                None
            }
        },
        _ => None,
    }
}

fn decode(text: &str) -> GatewayResult<GatewayPayload> {
    serde_json::from_str(text).map_err(|e| GatewayError::Protocol {
        reason: format!("undecodable frame: {}", e),
    })
}

fn identify_payload(token: &str) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": 0,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "dockhand",
                "device": "dockhand"
            }
        }
    })
}

fn heartbeat_payload(sequence: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": sequence })
}

fn connection_error(e: impl std::fmt::Display) -> GatewayError {
    GatewayError::Connection {
        reason: e.to_string(),
    }
}
