//! The input queue feeding a live agent session.

use crate::content::{Blob, Content};
use tokio::sync::mpsc;

/// A single request pushed into the agent session.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveRequest {
    /// Structured content (typed text from the client).
    Content(Content),
    /// A realtime binary blob (streamed audio from the client).
    Realtime(Blob),
    /// End-of-input marker; the session should wind down after this.
    Close,
}

/// Error returned when the session side of the queue is gone.
#[derive(Debug, thiserror::Error)]
#[error("live request queue is closed")]
pub struct QueueClosed;

/// Producer handle for a session's input queue.
///
/// Clonable; the paired receiver is handed to the runner when the session
/// starts. The inbound relay is the sole producer during a connection's
/// lifetime, the supervisor only sends the final [`LiveRequest::Close`].
#[derive(Debug, Clone)]
pub struct LiveRequestQueue {
    tx: mpsc::Sender<LiveRequest>,
}

impl LiveRequestQueue {
    /// Creates a bounded queue, returning the producer handle and the
    /// receiver to pass to [`crate::runner::AgentRunner::run_live`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<LiveRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Sends a structured content unit to the agent.
    pub async fn send_content(&self, content: Content) -> Result<(), QueueClosed> {
        self.tx
            .send(LiveRequest::Content(content))
            .await
            .map_err(|_| QueueClosed)
    }

    /// Sends a raw realtime blob to the agent.
    pub async fn send_realtime(&self, blob: Blob) -> Result<(), QueueClosed> {
        self.tx
            .send(LiveRequest::Realtime(blob))
            .await
            .map_err(|_| QueueClosed)
    }

    /// Signals end of input. Safe to call when the session is already gone.
    pub async fn close(&self) {
        let _ = self.tx.send(LiveRequest::Close).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn requests_arrive_in_send_order() {
        let (queue, mut rx) = LiveRequestQueue::new(8);

        queue.send_content(Content::user_text("first")).await.unwrap();
        queue
            .send_realtime(Blob {
                mime_type: "audio/pcm".to_string(),
                data: vec![1u8, 2, 3].into(),
            })
            .await
            .unwrap();
        queue.send_content(Content::user_text("second")).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(LiveRequest::Content(Content::user_text("first")))
        );
        assert!(matches!(rx.recv().await, Some(LiveRequest::Realtime(_))));
        assert_eq!(
            rx.recv().await,
            Some(LiveRequest::Content(Content::user_text("second")))
        );
    }

    #[tokio::test]
    async fn close_delivers_marker_and_is_idempotent() {
        let (queue, mut rx) = LiveRequestQueue::new(8);

        queue.close().await;
        assert_eq!(rx.recv().await, Some(LiveRequest::Close));

        // A second close after the receiver is gone must not error or panic.
        drop(rx);
        queue.close().await;
    }

    #[tokio::test]
    async fn send_after_session_gone_reports_closed() {
        let (queue, rx) = LiveRequestQueue::new(8);
        drop(rx);

        let err = queue.send_content(Content::user_text("hi")).await;
        assert!(err.is_err());
    }
}
