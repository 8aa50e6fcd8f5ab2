//! The seam between the relay core and the hosted agent service.

use crate::event::LiveEvent;
use crate::queue::LiveRequest;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Which modality the agent should respond in. Fixed for the lifetime of a
/// session; the service rejects mixed modalities on the live endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseModality {
    Text,
    Audio,
}

/// Per-session run options.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    pub response_modality: ResponseModality,
}

/// Opaque handle for one conversation with the agent service.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub app_name: String,
    pub user_id: String,
}

/// Errors surfaced by a runner while driving a live session.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to reach the live endpoint: {0}")]
    Connect(String),
    #[error("live transport error: {0}")]
    Transport(String),
}

/// A lazy, single-pass sequence of translated agent events.
pub type LiveEventStream = Pin<Box<dyn Stream<Item = Result<LiveEvent, RunnerError>> + Send>>;

/// Creates sessions and drives live exchanges against the agent service.
///
/// Implementations own all protocol details of the upstream service; callers
/// only see [`LiveRequest`]s going in and [`LiveEvent`]s coming out.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Opens a new session for the given user.
    async fn create_session(&self, user_id: &str) -> Result<Session, RunnerError>;

    /// Starts the live exchange for a session.
    ///
    /// Input arrives on `requests` until a [`LiveRequest::Close`] marker or
    /// the channel is dropped; translated events are yielded on the returned
    /// stream until the session ends or an error terminates it.
    fn run_live(
        &self,
        session: Session,
        requests: mpsc::Receiver<LiveRequest>,
        config: RunConfig,
    ) -> LiveEventStream;
}
