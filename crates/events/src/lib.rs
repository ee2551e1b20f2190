//! Guidepost session signal bus and notification delivery.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SessionSignal`] — the session lifecycle event envelope.
//! - [`CompletionNotifier`] — background service that mails learners on
//!   session completion, fire-and-forget.
//! - [`delivery`] — the SMTP delivery channel.
//!
//! Signals are side-effect hooks, not the ledger: delivery failures are
//! logged and never roll back a state transition.

pub mod bus;
pub mod delivery;
pub mod notifier;

pub use bus::{EventBus, SessionSignal, SESSION_COMPLETED};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use notifier::CompletionNotifier;
