//! The connection supervisor: owns one client connection and its agent session.

use super::relay::{RelayError, agent_to_client, client_to_agent};
use crate::state::AppState;
use axum::{
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use stewart_live::{LiveRequestQueue, ResponseModality, RunConfig};
use tokio::{
    sync::Mutex,
    task::{JoinError, JoinHandle},
};
use tracing::{error, info, instrument, warn};

/// Capacity of the per-connection agent input queue.
const REQUEST_QUEUE_CAPACITY: usize = 128;

/// How long a cancelled peer relay gets to acknowledge cancellation before
/// teardown proceeds without it.
const CANCEL_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    is_audio: Option<String>,
}

/// Axum handler to upgrade an HTTP connection to a WebSocket.
///
/// The path carries the client identifier; the `is_audio` query parameter
/// ("true"/"false") fixes the response modality for the whole connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    Query(query): Query<SessionQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let is_audio = query.is_audio.as_deref() == Some("true");
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, is_audio))
}

/// Main handler for an individual WebSocket connection.
///
/// Obtains a session and its input queue from the runner, starts both relay
/// tasks, races them, and tears down: cancel the peer within a grace window,
/// close the queue exactly once, and close the socket.
#[instrument(name = "ws_session", skip_all, fields(user_id = %user_id, is_audio = is_audio))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: String, is_audio: bool) {
    info!("Client connected");

    let session = match state.runner.create_session(&user_id).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to create agent session");
            return;
        }
    };
    let (queue, requests) = LiveRequestQueue::new(REQUEST_QUEUE_CAPACITY);
    let run_config = RunConfig {
        response_modality: if is_audio {
            ResponseModality::Audio
        } else {
            ResponseModality::Text
        },
    };
    let events = state.runner.run_live(session, requests, run_config);

    let (socket_tx, mut socket_rx) = socket.split();
    let socket_tx = Arc::new(Mutex::new(socket_tx));

    let mut outbound = tokio::spawn(agent_to_client(events, socket_tx.clone()));
    let inbound_tx = socket_tx.clone();
    let inbound_queue = queue.clone();
    let mut inbound = tokio::spawn(async move {
        client_to_agent(&mut socket_rx, inbound_tx, &inbound_queue).await
    });

    // First relay to finish wins; the peer is cancelled.
    let faulted = tokio::select! {
        result = &mut outbound => {
            let faulted = relay_finished("agent_to_client", result);
            cancel_peer("client_to_agent", inbound).await;
            faulted
        }
        result = &mut inbound => {
            let faulted = relay_finished("client_to_agent", result);
            cancel_peer("agent_to_client", outbound).await;
            faulted
        }
    };

    // Session release happens exactly once, whichever relay ended first.
    queue.close().await;
    info!("Live request queue closed");

    if faulted {
        let mut sink = socket_tx.lock().await;
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: close_code::ERROR,
                reason: Utf8Bytes::from_static("server-side error"),
            })))
            .await;
    }
    info!("Connection fully closed");
}

/// Logs how a relay finished and reports whether it faulted.
fn relay_finished(relay: &str, result: Result<Result<(), RelayError>, JoinError>) -> bool {
    match result {
        Ok(Ok(())) => {
            info!(relay, "Relay finished cleanly");
            false
        }
        Ok(Err(e)) => {
            error!(relay, error = %e, "Relay terminated with error");
            true
        }
        Err(e) => {
            error!(relay, error = %e, "Relay task failed to complete");
            true
        }
    }
}

/// Cancels the still-running peer relay and waits for it within the grace
/// window. A relay that does not stop in time is logged and abandoned;
/// teardown proceeds regardless.
async fn cancel_peer(relay: &str, mut handle: JoinHandle<Result<(), RelayError>>) {
    handle.abort();
    match tokio::time::timeout(CANCEL_GRACE, &mut handle).await {
        Ok(Ok(Ok(()))) => info!(relay, "Peer relay finished during shutdown"),
        Ok(Ok(Err(e))) => warn!(relay, error = %e, "Peer relay ended with error during shutdown"),
        Ok(Err(join_err)) if join_err.is_cancelled() => {
            info!(relay, "Peer relay cancelled");
        }
        Ok(Err(join_err)) => error!(relay, error = %join_err, "Peer relay panicked during shutdown"),
        Err(_) => warn!(relay, "Peer relay did not stop within the grace window"),
    }
}
