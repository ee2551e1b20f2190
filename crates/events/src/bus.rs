//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`SessionSignal`]s emitted
//! by the playback engine. It is designed to be shared via `Arc<EventBus>`
//! across the application.

use chrono::{DateTime, Utc};
use guidepost_core::types::{DbId, LearnerId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// SessionSignal
// ---------------------------------------------------------------------------

/// Signal emitted when a session completes.
pub const SESSION_COMPLETED: &str = "session.completed";

/// A session lifecycle event published on the bus.
///
/// Constructed via [`SessionSignal::new`] and enriched with the builder
/// methods [`with_notify_email`](SessionSignal::with_notify_email) and
/// [`with_payload`](SessionSignal::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSignal {
    /// Dot-separated signal name, e.g. `"session.completed"`.
    pub signal_type: String,

    pub session_id: DbId,
    pub learner_id: LearnerId,
    pub video_id: DbId,

    /// Address to notify, when the learner opted in at session start.
    pub notify_email: Option<String>,

    /// Free-form JSON payload carrying signal-specific data.
    pub payload: serde_json::Value,

    /// When the signal was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl SessionSignal {
    pub fn new(
        signal_type: impl Into<String>,
        session_id: DbId,
        learner_id: LearnerId,
        video_id: DbId,
    ) -> Self {
        Self {
            signal_type: signal_type.into(),
            session_id,
            learner_id,
            video_id,
            notify_email: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_notify_email(mut self, email: Option<String>) -> Self {
        self.notify_email = email;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for session signals.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`SessionSignal`].
pub struct EventBus {
    sender: broadcast::Sender<SessionSignal>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a signal to all current subscribers.
    ///
    /// If there are no active subscribers the signal is silently dropped;
    /// signals are advisory side-effect hooks, not durable state.
    pub fn publish(&self, signal: SessionSignal) {
        // A SendError only means there are zero receivers right now.
        let _ = self.sender.send(signal);
    }

    /// Subscribe to all signals published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn signal() -> SessionSignal {
        SessionSignal::new(SESSION_COMPLETED, 1, Uuid::nil(), 2)
    }

    #[tokio::test]
    async fn subscriber_receives_published_signal() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(signal());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.signal_type, SESSION_COMPLETED);
        assert_eq!(received.session_id, 1);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(signal());

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(signal());
    }

    #[test]
    fn builder_methods_attach_fields() {
        let s = signal()
            .with_notify_email(Some("learner@example.com".into()))
            .with_payload(serde_json::json!({"video_title": "Intro"}));
        assert_eq!(s.notify_email.as_deref(), Some("learner@example.com"));
        assert_eq!(s.payload["video_title"], "Intro");
    }
}
