//! Completion notification service.
//!
//! [`CompletionNotifier`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and sends a congratulation email whenever a
//! `session.completed` signal carries a notify address. It runs as a
//! long-lived background task and shuts down gracefully when the bus sender
//! is dropped. Delivery failures are logged, never retried, and never affect
//! session state.

use tokio::sync::broadcast;

use crate::bus::{SessionSignal, SESSION_COMPLETED};
use crate::delivery::email::EmailDelivery;

/// Background service that mails learners when their session completes.
pub struct CompletionNotifier;

impl CompletionNotifier {
    /// Run the notification loop.
    ///
    /// Subscribes to the event bus via the provided `receiver` and sends an
    /// email for every completion signal with a notify address. The loop
    /// exits when the channel is closed (i.e. the
    /// [`EventBus`](crate::bus::EventBus) is dropped).
    pub async fn run(delivery: EmailDelivery, mut receiver: broadcast::Receiver<SessionSignal>) {
        loop {
            match receiver.recv().await {
                Ok(signal) => {
                    if signal.signal_type != SESSION_COMPLETED {
                        continue;
                    }
                    let Some(to_email) = signal.notify_email.clone() else {
                        continue;
                    };
                    if let Err(e) = delivery.deliver(&to_email, &signal).await {
                        tracing::error!(
                            error = %e,
                            session_id = signal.session_id,
                            "Failed to send completion email"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Completion notifier lagged, some signals were not delivered"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, completion notifier shutting down");
                    break;
                }
            }
        }
    }
}
