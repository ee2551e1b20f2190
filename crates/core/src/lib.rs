//! Guidepost domain core.
//!
//! Pure playback-session logic with no async and no database knowledge:
//!
//! - [`registry`] — the ordered checkpoint set for a primary video.
//! - [`resolver`] — the pure checkpoint-outcome → decision function.
//! - [`session`] — the per-learner playback state machine and event replay.
//! - [`ledger`] — progress event types and the gapless in-memory ledger.
//! - [`timecode`] — `HH:MM:SS` offset parsing used by authoring.
//!
//! The api crate drives this core; the db crate persists its output. Every
//! state transition here is expressed as a list of [`ledger::ProgressEvent`]s
//! that is appended atomically, so the ledger alone can always rebuild the
//! live session state.

pub mod error;
pub mod ledger;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod timecode;
pub mod types;
