//! Runner implementation over the Gemini Live WebSocket API.

use crate::{
    agent::{AgentConfig, AgentTool},
    event::{EventPart, LiveEvent},
    queue::LiveRequest,
    runner::{AgentRunner, LiveEventStream, ResponseModality, RunConfig, RunnerError, Session},
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const LIVE_WS_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Application name recorded on every session handle.
pub const APP_NAME: &str = "stewart";

/// How many translated events may be buffered before the runner task
/// backpressures on the consumer.
const EVENT_BUFFER: usize = 32;

// --- Gemini Live wire types (local to this module) ---
mod wire {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) enum ClientMessage {
        Setup(Setup),
        RealtimeInput(RealtimeInput),
        ClientContent(ClientContent),
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct Setup {
        pub model: String,
        pub generation_config: GenerationConfig,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub system_instruction: Option<Content>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub tools: Vec<Tool>,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct GenerationConfig {
        pub response_modalities: Vec<Modality>,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub(crate) enum Modality {
        Text,
        Audio,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct Tool {
        pub google_search: serde_json::Value,
    }

    #[derive(Serialize)]
    pub(crate) struct Content {
        pub role: String,
        pub parts: Vec<Part>,
    }

    #[derive(Serialize)]
    pub(crate) struct Part {
        pub text: String,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct ClientContent {
        pub turns: Vec<Content>,
        pub turn_complete: bool,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct RealtimeInput {
        pub audio: Blob,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct Blob {
        pub mime_type: String,
        pub data: String,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct ServerMessage {
        pub setup_complete: Option<serde_json::Value>,
        pub server_content: Option<ServerContent>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase", default)]
    pub(crate) struct ServerContent {
        pub model_turn: Option<ModelTurn>,
        pub turn_complete: Option<bool>,
        pub interrupted: Option<bool>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(default)]
    pub(crate) struct ModelTurn {
        pub parts: Vec<ServerPart>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase", default)]
    pub(crate) struct ServerPart {
        pub text: Option<String>,
        pub inline_data: Option<ServerBlob>,
        pub function_call: Option<FunctionCall>,
        pub function_response: Option<FunctionResponse>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase", default)]
    pub(crate) struct ServerBlob {
        pub mime_type: String,
        pub data: String,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(default)]
    pub(crate) struct FunctionCall {
        pub name: String,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(default)]
    pub(crate) struct FunctionResponse {
        pub name: String,
    }
}

/// [`AgentRunner`] backed by the Gemini Live bidirectional WebSocket API.
///
/// Shared process-wide; each `run_live` call drives an independent upstream
/// connection on its own task.
pub struct GeminiLiveRunner {
    api_key: String,
    agent: AgentConfig,
    endpoint: String,
}

impl GeminiLiveRunner {
    pub fn new(api_key: impl Into<String>, agent: AgentConfig) -> Self {
        Self {
            api_key: api_key.into(),
            agent,
            endpoint: LIVE_WS_ENDPOINT.to_string(),
        }
    }
}

#[async_trait]
impl AgentRunner for GeminiLiveRunner {
    async fn create_session(&self, user_id: &str) -> Result<Session, RunnerError> {
        Ok(Session {
            id: Uuid::new_v4(),
            app_name: APP_NAME.to_string(),
            user_id: user_id.to_string(),
        })
    }

    fn run_live(
        &self,
        session: Session,
        requests: mpsc::Receiver<LiveRequest>,
        config: RunConfig,
    ) -> LiveEventStream {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let agent = self.agent.clone();

        tokio::spawn(async move {
            let session_id = session.id;
            if let Err(e) = drive_session(url, agent, config, session, requests, &events_tx).await
            {
                error!(%session_id, error = %e, "Live session terminated with error");
                let _ = events_tx.send(Err(e)).await;
            }
        });

        Box::pin(ReceiverStream::new(events_rx))
    }
}

/// Builds the setup message announcing model, modality, persona and tools.
fn setup_message(agent: &AgentConfig, config: &RunConfig) -> wire::ClientMessage {
    let modality = match config.response_modality {
        ResponseModality::Audio => wire::Modality::Audio,
        ResponseModality::Text => wire::Modality::Text,
    };
    wire::ClientMessage::Setup(wire::Setup {
        model: format!("models/{}", agent.model),
        generation_config: wire::GenerationConfig {
            response_modalities: vec![modality],
        },
        system_instruction: Some(wire::Content {
            role: "system".to_string(),
            parts: vec![wire::Part {
                text: agent.instruction.clone(),
            }],
        }),
        tools: agent
            .tools
            .iter()
            .map(|tool| match tool {
                AgentTool::GoogleSearch => wire::Tool {
                    google_search: serde_json::json!({}),
                },
            })
            .collect(),
    })
}

async fn drive_session(
    url: String,
    agent: AgentConfig,
    config: RunConfig,
    session: Session,
    mut requests: mpsc::Receiver<LiveRequest>,
    events: &mpsc::Sender<Result<LiveEvent, RunnerError>>,
) -> Result<(), RunnerError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| RunnerError::Connect(e.to_string()))?;
    info!(
        session_id = %session.id,
        app = %session.app_name,
        user_id = %session.user_id,
        agent = %agent.name,
        "Connected to Gemini Live WebSocket"
    );
    let (mut live_tx, mut live_rx) = ws_stream.split();

    send_json(&mut live_tx, &setup_message(&agent, &config)).await?;

    // The service acknowledges setup before accepting any input.
    loop {
        match live_rx.next().await {
            Some(Ok(msg)) => {
                let Some(server_msg) = parse_server_message(&msg) else {
                    continue;
                };
                if server_msg.setup_complete.is_some() {
                    info!(session_id = %session.id, "Gemini session setup complete");
                    break;
                }
                warn!(session_id = %session.id, "Unexpected message during setup");
            }
            Some(Err(e)) => return Err(RunnerError::Connect(e.to_string())),
            None => {
                return Err(RunnerError::Connect(
                    "connection closed during setup".to_string(),
                ));
            }
        }
    }

    loop {
        tokio::select! {
            request = requests.recv() => {
                match request {
                    Some(LiveRequest::Content(content)) => {
                        let msg = wire::ClientMessage::ClientContent(wire::ClientContent {
                            turns: vec![wire::Content {
                                role: content.role,
                                parts: content
                                    .parts
                                    .into_iter()
                                    .map(|p| wire::Part { text: p.text })
                                    .collect(),
                            }],
                            turn_complete: true,
                        });
                        send_json(&mut live_tx, &msg).await?;
                    }
                    Some(LiveRequest::Realtime(blob)) => {
                        let msg = wire::ClientMessage::RealtimeInput(wire::RealtimeInput {
                            audio: wire::Blob {
                                mime_type: blob.mime_type,
                                data: BASE64.encode(&blob.data),
                            },
                        });
                        send_json(&mut live_tx, &msg).await?;
                    }
                    Some(LiveRequest::Close) | None => {
                        info!(session_id = %session.id, "Request queue closed. Ending live session");
                        let _ = live_tx.send(WsMessage::Close(None)).await;
                        break;
                    }
                }
            }
            upstream = live_rx.next() => {
                match upstream {
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!(session_id = %session.id, ?frame, "Gemini closed the live connection");
                        break;
                    }
                    Some(Ok(msg)) => {
                        let Some(server_msg) = parse_server_message(&msg) else {
                            continue;
                        };
                        if let Some(content) = server_msg.server_content {
                            let event = translate(content);
                            if events.send(Ok(event)).await.is_err() {
                                debug!(session_id = %session.id, "Event consumer dropped. Ending live session");
                                break;
                            }
                        }
                    }
                    Some(Err(e)) => return Err(RunnerError::Transport(e.to_string())),
                    None => break,
                }
            }
        }
    }
    Ok(())
}

/// Parses a WebSocket message into a server payload. The service delivers
/// JSON in both text and binary frames; pings and pongs yield `None`.
fn parse_server_message(msg: &WsMessage) -> Option<wire::ServerMessage> {
    let parsed = match msg {
        WsMessage::Text(text) => serde_json::from_str::<wire::ServerMessage>(text),
        WsMessage::Binary(data) => serde_json::from_slice::<wire::ServerMessage>(data),
        _ => return None,
    };
    match parsed {
        Ok(server_msg) => Some(server_msg),
        Err(e) => {
            warn!(error = %e, "Failed to parse Gemini server message");
            None
        }
    }
}

/// Translates one `serverContent` payload into a [`LiveEvent`].
///
/// Inline audio is base64-decoded here so consumers only ever see raw bytes;
/// parts whose shape we do not handle become diagnostic variants instead of
/// being dropped silently.
fn translate(content: wire::ServerContent) -> LiveEvent {
    let mut parts = Vec::new();
    if let Some(model_turn) = content.model_turn {
        if model_turn.parts.is_empty() {
            debug!("Server content carried a model turn with no parts");
        }
        for part in model_turn.parts {
            if let Some(blob) = part.inline_data {
                if blob.mime_type.starts_with("audio/pcm") {
                    match BASE64.decode(&blob.data) {
                        Ok(bytes) if !bytes.is_empty() => parts.push(EventPart::Audio {
                            mime_type: blob.mime_type,
                            data: bytes.into(),
                        }),
                        Ok(_) => {
                            debug!(mime_type = %blob.mime_type, "Skipping empty inline audio part");
                        }
                        Err(e) => {
                            warn!(error = %e, mime_type = %blob.mime_type, "Dropping inline audio with invalid base64 payload");
                        }
                    }
                } else {
                    parts.push(EventPart::UnsupportedBlob {
                        mime_type: blob.mime_type,
                    });
                }
            } else if let Some(text) = part.text {
                if !text.is_empty() {
                    parts.push(EventPart::Text(text));
                }
            } else if let Some(call) = part.function_call {
                parts.push(EventPart::FunctionCall(call.name));
            } else if let Some(response) = part.function_response {
                parts.push(EventPart::FunctionResponse(response.name));
            } else {
                parts.push(EventPart::Unrecognized);
            }
        }
    }
    LiveEvent {
        turn_complete: content.turn_complete.unwrap_or(false),
        interrupted: content.interrupted.unwrap_or(false),
        parts,
    }
}

async fn send_json<S>(sink: &mut S, msg: &wire::ClientMessage) -> Result<(), RunnerError>
where
    S: futures_util::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let serialized =
        serde_json::to_string(msg).map_err(|e| RunnerError::Transport(e.to_string()))?;
    sink.send(WsMessage::Text(serialized.into()))
        .await
        .map_err(|e| RunnerError::Transport(e.to_string()))?;
    Ok(())
}
