//! Input types handed to the agent session.

use bytes::Bytes;

/// A single piece of structured content.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub text: String,
}

/// Structured content attributed to a conversation role.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    /// Wraps a plain text message as a user-role content unit.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// A raw binary payload (e.g. PCM audio) sent outside the structured-content path.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub mime_type: String,
    pub data: Bytes,
}
