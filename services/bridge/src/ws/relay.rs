//! The two one-directional relay loops at the heart of the bridge.
//!
//! Both loops are generic over the socket halves so they run unchanged
//! against a split axum WebSocket in production and against in-memory
//! stream/sink doubles in tests.

use super::protocol::{ClientFrame, MIME_AUDIO_PCM, MIME_TEXT_PLAIN, ServerFrame};
use axum::extract::ws::Message;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use stewart_live::{Blob, Content, EventPart, LiveEvent, LiveRequestQueue, QueueClosed, RunnerError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How a relay loop can fail. A clean client disconnect is not an error;
/// both loops return `Ok(())` for it.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The agent event stream failed; the 1011-equivalent fatal path.
    #[error("server-side error: {0}")]
    Agent(#[from] RunnerError),
    /// The client socket failed mid-write, or sent a frame outside the
    /// JSON-over-text protocol.
    #[error("client transport error: {0}")]
    Transport(String),
    /// A frame could not be serialized or parsed as JSON.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    /// An audio payload was not valid base64.
    #[error("invalid base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The agent input queue went away while the client was still sending.
    #[error(transparent)]
    Queue(#[from] QueueClosed),
}

/// Serializes a frame and sends it to the client socket.
pub(crate) async fn send_frame<S>(socket_tx: &mut S, frame: ServerFrame) -> Result<(), RelayError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let serialized = serde_json::to_string(&frame)?;
    socket_tx
        .send(Message::Text(serialized.into()))
        .await
        .map_err(|e| RelayError::Transport(e.to_string()))?;
    Ok(())
}

/// Outbound relay: drains the agent event stream and forwards frames to the
/// client until the stream ends or an error terminates it.
///
/// Frames are emitted in the exact order parts appear within an event, and
/// events are processed in stream order. Turn-status frames go out first,
/// even when the event carries no content. Partial text chunks are never
/// suppressed or coalesced.
pub async fn agent_to_client<E, S>(
    mut events: E,
    socket_tx: Arc<Mutex<S>>,
) -> Result<(), RelayError>
where
    E: Stream<Item = Result<LiveEvent, RunnerError>> + Unpin,
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(event) = events.next().await {
        let event = event?;

        if event.is_status() {
            let mut sink = socket_tx.lock().await;
            send_frame(
                &mut *sink,
                ServerFrame::TurnStatus {
                    turn_complete: event.turn_complete,
                    interrupted: event.interrupted,
                },
            )
            .await?;
            debug!(
                turn_complete = event.turn_complete,
                interrupted = event.interrupted,
                "Forwarded turn status to client"
            );
        }

        if event.parts.is_empty() {
            if !event.is_status() {
                debug!("Agent event carried no forwardable parts");
            }
            continue;
        }

        for part in event.parts {
            match part {
                EventPart::Audio { mime_type, data } => {
                    let mut sink = socket_tx.lock().await;
                    send_frame(&mut *sink, ServerFrame::audio_chunk(&data)).await?;
                    debug!(%mime_type, bytes = data.len(), "Forwarded audio chunk to client");
                }
                EventPart::Text(text) => {
                    let mut sink = socket_tx.lock().await;
                    send_frame(&mut *sink, ServerFrame::text_chunk(&text)).await?;
                    debug!(chars = text.len(), "Forwarded text chunk to client");
                }
                EventPart::FunctionCall(name) => {
                    debug!(%name, "Skipping function call echo");
                }
                EventPart::FunctionResponse(name) => {
                    debug!(%name, "Skipping function response echo");
                }
                EventPart::UnsupportedBlob { mime_type } => {
                    warn!(%mime_type, "Skipping inline data with unhandled mime type");
                }
                EventPart::Unrecognized => {
                    warn!("Skipping unrecognized event part");
                }
            }
        }
    }
    Ok(())
}

/// Inbound relay: reads framed messages from the client socket and forwards
/// them into the agent input queue until the socket closes.
///
/// An unsupported mime type is recoverable: the client gets a single error
/// frame and the loop continues. The socket going away ends the loop
/// without error, whether or not the close handshake happened. Everything
/// else that goes wrong is fatal for this relay.
pub async fn client_to_agent<R, S>(
    socket_rx: &mut R,
    socket_tx: Arc<Mutex<S>>,
    queue: &LiveRequestQueue,
) -> Result<(), RelayError>
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(msg_result) = socket_rx.next().await {
        let ws_msg = match msg_result {
            Ok(msg) => msg,
            // A reset without the close handshake is still a disconnect,
            // not a relay fault.
            Err(e) => {
                info!(error = %e, "Client connection ended abruptly");
                return Ok(());
            }
        };
        match ws_msg {
            Message::Text(text) => {
                let frame: ClientFrame = serde_json::from_str(&text)?;
                match frame.mime_type.as_str() {
                    MIME_TEXT_PLAIN => {
                        debug!(chars = frame.data.len(), "Forwarding text to agent");
                        queue.send_content(Content::user_text(frame.data)).await?;
                    }
                    MIME_AUDIO_PCM => {
                        let decoded = BASE64.decode(&frame.data)?;
                        debug!(bytes = decoded.len(), "Forwarding audio to agent");
                        queue
                            .send_realtime(Blob {
                                mime_type: frame.mime_type,
                                data: decoded.into(),
                            })
                            .await?;
                    }
                    unsupported => {
                        warn!(mime_type = %unsupported, "Rejecting unsupported client frame");
                        let mut sink = socket_tx.lock().await;
                        send_frame(
                            &mut *sink,
                            ServerFrame::error(format!(
                                "Mime type not supported: {unsupported}"
                            )),
                        )
                        .await?;
                    }
                }
            }
            Message::Close(_) => {
                info!("Client sent close frame");
                return Ok(());
            }
            Message::Binary(_) => {
                return Err(RelayError::Transport(
                    "unexpected binary frame from client".to_string(),
                ));
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    info!("Client socket stream ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as frame_channel;
    use futures::stream;
    use serde_json::{Value, json};
    use stewart_live::LiveRequest;

    fn text_msg(raw: &str) -> Message {
        Message::Text(raw.to_string().into())
    }

    fn parse_sent(msg: Message) -> Value {
        match msg {
            Message::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    async fn run_outbound<E>(events: E) -> (Result<(), RelayError>, Vec<Value>)
    where
        E: Stream<Item = Result<LiveEvent, RunnerError>> + Unpin,
    {
        let (sink_tx, sink_rx) = frame_channel::unbounded::<Message>();
        let socket_tx = Arc::new(Mutex::new(sink_tx));
        let result = agent_to_client(events, socket_tx.clone()).await;
        drop(socket_tx);
        let frames = sink_rx.map(parse_sent).collect().await;
        (result, frames)
    }

    async fn run_inbound(
        incoming: Vec<Result<Message, axum::Error>>,
    ) -> (Result<(), RelayError>, Vec<Value>, Vec<LiveRequest>) {
        let mut socket_rx = stream::iter(incoming);
        let (sink_tx, sink_rx) = frame_channel::unbounded::<Message>();
        let socket_tx = Arc::new(Mutex::new(sink_tx));
        let (queue, mut queue_rx) = LiveRequestQueue::new(8);

        let result = client_to_agent(&mut socket_rx, socket_tx.clone(), &queue).await;

        drop(socket_tx);
        drop(queue);
        let frames = sink_rx.map(parse_sent).collect().await;
        let mut requests = Vec::new();
        while let Some(request) = queue_rx.recv().await {
            requests.push(request);
        }
        (result, frames, requests)
    }

    #[tokio::test]
    async fn status_frame_goes_out_before_later_content() {
        let events = stream::iter(vec![
            Ok(LiveEvent {
                turn_complete: true,
                interrupted: false,
                parts: vec![],
            }),
            Ok(LiveEvent {
                parts: vec![EventPart::Text("after the turn".to_string())],
                ..Default::default()
            }),
        ]);

        let (result, frames) = run_outbound(events).await;
        assert!(result.is_ok());
        assert_eq!(
            frames,
            vec![
                json!({"turn_complete": true, "interrupted": false}),
                json!({"mime_type": "text/plain", "data": "after the turn"}),
            ]
        );
    }

    #[tokio::test]
    async fn partial_text_chunks_are_all_forwarded_in_order() {
        let events = stream::iter(vec![Ok(LiveEvent {
            parts: vec![
                EventPart::Text("He".to_string()),
                EventPart::Text("llo".to_string()),
            ],
            ..Default::default()
        })]);

        let (result, frames) = run_outbound(events).await;
        assert!(result.is_ok());
        assert_eq!(
            frames,
            vec![
                json!({"mime_type": "text/plain", "data": "He"}),
                json!({"mime_type": "text/plain", "data": "llo"}),
            ]
        );
    }

    #[tokio::test]
    async fn audio_parts_round_trip_exact_bytes() {
        let payload = vec![0u8, 17, 254, 3];
        let events = stream::iter(vec![Ok(LiveEvent {
            parts: vec![EventPart::Audio {
                mime_type: "audio/pcm;rate=24000".to_string(),
                data: payload.clone().into(),
            }],
            ..Default::default()
        })]);

        let (result, frames) = run_outbound(events).await;
        assert!(result.is_ok());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["mime_type"], "audio/pcm");
        let decoded = BASE64.decode(frames[0]["data"].as_str().unwrap()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn diagnostic_parts_are_not_forwarded() {
        let events = stream::iter(vec![Ok(LiveEvent {
            parts: vec![
                EventPart::FunctionCall("google_search".to_string()),
                EventPart::FunctionResponse("google_search".to_string()),
                EventPart::UnsupportedBlob {
                    mime_type: "image/png".to_string(),
                },
                EventPart::Unrecognized,
            ],
            ..Default::default()
        })]);

        let (result, frames) = run_outbound(events).await;
        assert!(result.is_ok());
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn stream_error_is_fatal_for_the_outbound_relay() {
        let events = stream::iter(vec![
            Ok(LiveEvent {
                parts: vec![EventPart::Text("before".to_string())],
                ..Default::default()
            }),
            Err(RunnerError::Transport("upstream gone".to_string())),
        ]);

        let (result, frames) = run_outbound(events).await;
        assert!(matches!(result, Err(RelayError::Agent(_))));
        assert_eq!(frames.len(), 1);
    }

    #[tokio::test]
    async fn inbound_text_reaches_queue_in_order_with_no_client_frames() {
        let (result, frames, requests) = run_inbound(vec![
            Ok(text_msg(r#"{"mime_type": "text/plain", "data": "Hello"}"#)),
            Ok(text_msg(r#"{"mime_type": "text/plain", "data": "again"}"#)),
        ])
        .await;

        assert!(result.is_ok());
        assert!(frames.is_empty());
        assert_eq!(
            requests,
            vec![
                LiveRequest::Content(Content::user_text("Hello")),
                LiveRequest::Content(Content::user_text("again")),
            ]
        );
    }

    #[tokio::test]
    async fn inbound_audio_is_decoded_to_exact_bytes() {
        let payload = vec![1u8, 2, 3, 250];
        let encoded = BASE64.encode(&payload);
        let raw = format!(r#"{{"mime_type": "audio/pcm", "data": "{encoded}"}}"#);

        let (result, frames, requests) = run_inbound(vec![Ok(text_msg(&raw))]).await;

        assert!(result.is_ok());
        assert!(frames.is_empty());
        assert_eq!(
            requests,
            vec![LiveRequest::Realtime(Blob {
                mime_type: "audio/pcm".to_string(),
                data: payload.into(),
            })]
        );
    }

    #[tokio::test]
    async fn unsupported_mime_gets_one_error_frame_and_loop_continues() {
        let (result, frames, requests) = run_inbound(vec![
            Ok(text_msg(r#"{"mime_type": "video/mp4", "data": "xyz"}"#)),
            Ok(text_msg(r#"{"mime_type": "text/plain", "data": "still here"}"#)),
        ])
        .await;

        assert!(result.is_ok());
        assert_eq!(
            frames,
            vec![json!({"error": "Mime type not supported: video/mp4"})]
        );
        assert_eq!(
            requests,
            vec![LiveRequest::Content(Content::user_text("still here"))]
        );
    }

    #[tokio::test]
    async fn close_frame_ends_the_loop_cleanly() {
        let (result, frames, requests) = run_inbound(vec![
            Ok(Message::Close(None)),
            Ok(text_msg(r#"{"mime_type": "text/plain", "data": "never read"}"#)),
        ])
        .await;

        assert!(result.is_ok());
        assert!(frames.is_empty());
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_fatal() {
        let (result, _, requests) = run_inbound(vec![Ok(text_msg("not json"))]).await;
        assert!(matches!(result, Err(RelayError::Json(_))));
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn invalid_base64_audio_is_fatal() {
        let (result, _, requests) = run_inbound(vec![Ok(text_msg(
            r#"{"mime_type": "audio/pcm", "data": "@@not-base64@@"}"#,
        ))])
        .await;
        assert!(matches!(result, Err(RelayError::Base64(_))));
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn abrupt_transport_error_ends_loop_cleanly() {
        let (result, frames, requests) = run_inbound(vec![
            Err(axum::Error::new("connection reset")),
            Ok(text_msg(r#"{"mime_type": "text/plain", "data": "never read"}"#)),
        ])
        .await;

        assert!(result.is_ok());
        assert!(frames.is_empty());
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn binary_client_frame_is_fatal() {
        let (result, _, _) =
            run_inbound(vec![Ok(Message::Binary(vec![1u8, 2, 3].into()))]).await;
        assert!(matches!(result, Err(RelayError::Transport(_))));
    }
}
