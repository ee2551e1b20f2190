//! Session operation engine.
//!
//! Bridges the pure state machine in `guidepost_core` to the persistence
//! layer: loads the session and its video's checkpoint registry, runs one
//! operation, and commits the resulting ledger events and snapshot in a
//! single transaction.

pub mod playback;

pub use playback::{OperationOutcome, PlaybackEngine};
