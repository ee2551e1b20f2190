//! Outbound delivery channels for session notifications.

pub mod email;
