//! Client library for live, bidirectional agent sessions.
//!
//! This crate owns the boundary to the hosted agent service. It defines the
//! closed data model the rest of the system works with (input content, the
//! request queue, and translated output events), the [`runner::AgentRunner`]
//! trait that abstracts session creation, and a concrete runner that speaks
//! the Gemini Live WebSocket protocol.

pub mod agent;
pub mod content;
pub mod event;
pub mod gemini;
pub mod queue;
pub mod runner;

pub use agent::{AgentConfig, AgentTool};
pub use content::{Blob, Content, Part};
pub use event::{EventPart, LiveEvent};
pub use queue::{LiveRequest, LiveRequestQueue, QueueClosed};
pub use runner::{AgentRunner, LiveEventStream, ResponseModality, RunConfig, RunnerError, Session};
