//! The per-session event sink.
//!
//! Events go through a bounded channel to whoever streams them to the
//! client. The sink stops accepting events once a terminal event (`complete`
//! or a fatal `error`) has been sent, and reports when the receiver has gone
//! away or the session was cancelled.

use arena_types::DeploymentEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why an event could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The receiver was dropped.
    #[error("event receiver dropped")]
    Disconnected,

    /// The session was cancelled.
    #[error("session cancelled")]
    Cancelled,

    /// A terminal event was already sent.
    #[error("session already finished")]
    Finished,
}

/// Sending half of a session's event stream.
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::Sender<DeploymentEvent>,
    cancel: CancellationToken,
    finished: bool,
}

impl EventSink {
    /// A sink and its receiver with room for `capacity` undelivered events.
    pub fn channel(
        capacity: usize,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<DeploymentEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                cancel,
                finished: false,
            },
            rx,
        )
    }

    /// Deliver `event`, waiting for channel space.
    ///
    /// # Errors
    ///
    /// [`SinkError::Finished`] after a terminal event,
    /// [`SinkError::Cancelled`] once the token fires, and
    /// [`SinkError::Disconnected`] when the receiver is gone.
    pub async fn emit(&mut self, event: DeploymentEvent) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }
        if self.cancel.is_cancelled() {
            return Err(SinkError::Cancelled);
        }
        let terminal = event.is_terminal();
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(SinkError::Cancelled),
            sent = self.tx.send(event) => sent.map_err(|_closed| SinkError::Disconnected)?,
        }
        if terminal {
            self.finished = true;
        }
        Ok(())
    }

    /// Whether nobody will read further events.
    pub fn is_interrupted(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves once the session is cancelled or the receiver is dropped.
    pub async fn interrupted(&self) {
        tokio::select! {
            () = self.cancel.cancelled() => {}
            () = self.tx.closed() => {}
        }
    }

    /// Whether a terminal event has been sent.
    pub const fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use arena_types::{CompletionStatus, ErrorType};

    use super::*;

    #[tokio::test]
    async fn nothing_after_a_terminal_event() {
        let (mut sink, mut rx) = EventSink::channel(8, CancellationToken::new());
        sink.emit(DeploymentEvent::progress("loading", 0)).await.unwrap();
        sink.emit(DeploymentEvent::complete(CompletionStatus::Success, 1, 1))
            .await
            .unwrap();
        assert!(sink.is_finished());

        let err = sink.emit(DeploymentEvent::progress("late", 2)).await.unwrap_err();
        assert_eq!(err, SinkError::Finished);
        drop(sink);

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(event.kind());
        }
        assert_eq!(kinds, vec!["progress", "complete"]);
    }

    #[tokio::test]
    async fn recoverable_errors_are_not_terminal() {
        let (mut sink, _rx) = EventSink::channel(8, CancellationToken::new());
        sink.emit(DeploymentEvent::error(ErrorType::UnknownTool, "no such tool"))
            .await
            .unwrap();
        assert!(!sink.is_finished());
    }

    #[tokio::test]
    async fn dropped_receiver_is_detected() {
        let (mut sink, rx) = EventSink::channel(8, CancellationToken::new());
        drop(rx);
        assert!(sink.is_interrupted());
        sink.interrupted().await;
        let err = sink.emit(DeploymentEvent::progress("x", 1)).await.unwrap_err();
        assert_eq!(err, SinkError::Disconnected);
    }

    #[tokio::test]
    async fn cancellation_unblocks_a_full_channel() {
        let cancel = CancellationToken::new();
        let (mut sink, _rx) = EventSink::channel(1, cancel.clone());
        sink.emit(DeploymentEvent::progress("fills the buffer", 0)).await.unwrap();

        let blocked = tokio::spawn(async move { sink.emit(DeploymentEvent::progress("waits", 1)).await });
        cancel.cancel();
        assert_eq!(blocked.await.unwrap(), Err(SinkError::Cancelled));
    }
}
