//! Server-sent event streaming of deployment sessions.
//!
//! Every [`DeploymentEvent`] becomes one frame:
//!
//! ```text
//! event: <kind>
//! data: <JSON payload>
//! ```
//!
//! followed by a blank line. The stream owns a [`DropGuard`] for the
//! session's cancellation token, so a client that disconnects cancels its
//! session when Axum drops the response body.

use std::convert::Infallible;

use arena_types::DeploymentEvent;
use axum::response::sse::Event;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;
use tracing::warn;

/// The wire text of one event.
pub fn encode_frame(event: &DeploymentEvent) -> Result<String, serde_json::Error> {
    let data = serde_json::to_string(&event.payload.data()?)?;
    Ok(format!("event: {}\ndata: {data}\n\n", event.kind()))
}

/// `event` as an Axum SSE event.
pub fn to_sse_event(event: &DeploymentEvent) -> Result<Event, serde_json::Error> {
    let data = serde_json::to_string(&event.payload.data()?)?;
    Ok(Event::default().event(event.kind()).data(data))
}

/// Drain a session's receiver as an SSE body.
///
/// The stream ends when the session closes its sink. Dropping the stream
/// drops `guard`, which cancels the session.
pub fn event_stream(
    events: mpsc::Receiver<DeploymentEvent>,
    guard: DropGuard,
) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    futures::stream::unfold((events, guard), |(mut events, guard)| async move {
        loop {
            let event = events.recv().await?;
            match to_sse_event(&event) {
                Ok(frame) => return Some((Ok::<_, Infallible>(frame), (events, guard))),
                Err(e) => warn!(kind = event.kind(), error = %e, "Dropping unserializable event"),
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use arena_types::{CompletionStatus, ErrorType};
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    use super::*;

    #[test]
    fn frames_carry_kind_and_payload_only() {
        let frame = encode_frame(&DeploymentEvent::complete(CompletionStatus::Partial, 3, 2)).unwrap();
        assert_eq!(
            frame,
            "event: complete\ndata: {\"status\":\"partial\",\"total_steps\":3,\"total_tools_used\":2}\n\n"
        );
    }

    #[test]
    fn error_frames_include_recoverability() {
        let frame = encode_frame(&DeploymentEvent::error(ErrorType::UnknownTool, "no such tool")).unwrap();
        assert!(frame.starts_with("event: error\ndata: "));
        assert!(frame.contains("\"error_type\":\"unknown_tool\""));
        assert!(frame.contains("\"recoverable\":true"));
    }

    #[tokio::test]
    async fn stream_ends_with_the_session() {
        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let stream = event_stream(rx, cancel.clone().drop_guard());

        tx.send(DeploymentEvent::progress("loading", 0)).await.unwrap();
        tx.send(DeploymentEvent::complete(CompletionStatus::Failed, 0, 0))
            .await
            .unwrap();
        drop(tx);

        let frames: Vec<_> = stream.collect().await;
        assert_eq!(frames.len(), 2);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn dropping_the_stream_cancels_the_session() {
        let (_tx, rx) = mpsc::channel::<DeploymentEvent>(4);
        let cancel = CancellationToken::new();
        let stream = event_stream(rx, cancel.clone().drop_guard());
        assert!(!cancel.is_cancelled());
        drop(stream);
        assert!(cancel.is_cancelled());
    }
}
