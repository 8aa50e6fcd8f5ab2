//! Output events yielded by a live agent session.
//!
//! The wire payloads of the upstream service are loosely shaped; translation
//! into this closed set of variants happens inside the runner so that
//! downstream consumers can dispatch exhaustively.

use bytes::Bytes;

/// One event from the agent's live stream.
///
/// Turn flags and content parts are independent: an event may carry either,
/// both, or neither.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveEvent {
    /// The agent finished its current utterance.
    pub turn_complete: bool,
    /// The agent's utterance was cut off (e.g. the user started speaking).
    pub interrupted: bool,
    /// Content parts in the order they appeared in the upstream payload.
    pub parts: Vec<EventPart>,
}

impl LiveEvent {
    /// Whether this event carries turn-status information worth reporting.
    pub fn is_status(&self) -> bool {
        self.turn_complete || self.interrupted
    }
}

/// A single content part within a [`LiveEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventPart {
    /// Inline audio; only constructed for `audio/pcm*` mime types.
    Audio { mime_type: String, data: Bytes },
    /// A chunk of model text, possibly partial.
    Text(String),
    /// Echo of a tool invocation. Diagnostic only, never forwarded.
    FunctionCall(String),
    /// Echo of a tool result. Diagnostic only, never forwarded.
    FunctionResponse(String),
    /// Inline data with a mime type this system does not handle.
    UnsupportedBlob { mime_type: String },
    /// A part whose shape matched nothing we know about.
    Unrecognized,
}
