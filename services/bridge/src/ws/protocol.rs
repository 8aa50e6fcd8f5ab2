//! Defines the WebSocket frame protocol between the browser client and the bridge.
//!
//! Frames carry no `type` tag on the wire; each shape is distinguished by
//! its field names, matching what the browser client expects.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

pub const MIME_TEXT_PLAIN: &str = "text/plain";
pub const MIME_AUDIO_PCM: &str = "audio/pcm";

/// One frame from the client (browser) to the server.
///
/// `data` is raw UTF-8 text for `text/plain`, or base64-encoded PCM bytes
/// for `audio/pcm`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClientFrame {
    pub mime_type: String,
    pub data: String,
}

/// Frames from the server to the client (browser).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ServerFrame {
    /// Turn-status flags, emitted as soon as the agent reports them.
    TurnStatus {
        turn_complete: bool,
        interrupted: bool,
    },
    /// A content chunk: raw text, or base64-encoded audio.
    Chunk { mime_type: String, data: String },
    /// A recoverable, client-visible error (e.g. an unsupported mime type).
    Error { error: String },
}

impl ServerFrame {
    pub fn text_chunk(text: impl Into<String>) -> Self {
        ServerFrame::Chunk {
            mime_type: MIME_TEXT_PLAIN.to_string(),
            data: text.into(),
        }
    }

    pub fn audio_chunk(data: &[u8]) -> Self {
        ServerFrame::Chunk {
            mime_type: MIME_AUDIO_PCM.to_string(),
            data: BASE64.encode(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            error: message.into(),
        }
    }
}
