//! Progress ledger event types and the gapless in-memory ledger.
//!
//! The ledger is the single source of truth for a session: an append-only,
//! strictly ordered record of checkpoint interactions. The state machine's
//! live representation is a cache that must always equal a replay of these
//! events (see [`crate::session::SessionMachine::replay`]).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The six progress event kinds, serialized in kebab-case (`branch-entered`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressEventKind {
    /// Playback reached a checkpoint.
    Reached,
    /// The learner answered the pending checkpoint.
    Answered,
    /// Playback branched into a remedial clip.
    BranchEntered,
    /// The remedial clip finished; control returns to the primary video.
    BranchExited,
    /// An abandoned session was re-activated.
    Resumed,
    /// The session reached the end of the primary video. Terminal.
    Completed,
}

impl ProgressEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressEventKind::Reached => "reached",
            ProgressEventKind::Answered => "answered",
            ProgressEventKind::BranchEntered => "branch-entered",
            ProgressEventKind::BranchExited => "branch-exited",
            ProgressEventKind::Resumed => "resumed",
            ProgressEventKind::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "reached" => Ok(ProgressEventKind::Reached),
            "answered" => Ok(ProgressEventKind::Answered),
            "branch-entered" => Ok(ProgressEventKind::BranchEntered),
            "branch-exited" => Ok(ProgressEventKind::BranchExited),
            "resumed" => Ok(ProgressEventKind::Resumed),
            "completed" => Ok(ProgressEventKind::Completed),
            other => Err(CoreError::Validation(format!(
                "Unknown progress event kind: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Kind-dependent event payload, stored as JSONB.
///
/// Every payload records the primary-video offset the session held after the
/// event was applied; this is what makes position reconstructible from the
/// ledger alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    /// Primary-video offset after this event, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_secs: Option<f64>,
}

/// One immutable entry in a session's progress ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub session_id: DbId,
    /// Gapless, strictly increasing per session, starting at 1.
    pub seq_no: i64,
    pub kind: ProgressEventKind,
    pub payload: EventPayload,
    /// Wall-clock time of occurrence.
    pub occurred_at: Timestamp,
}

// ---------------------------------------------------------------------------
// In-memory ledger
// ---------------------------------------------------------------------------

/// Append-only event list enforcing the gapless-sequence contract.
///
/// The durable equivalent lives in the db crate
/// (`progress_events` + `UNIQUE (session_id, seq_no)`); this type backs
/// tests and replay.
#[derive(Debug, Default)]
pub struct Ledger {
    events: Vec<ProgressEvent>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event. Fails with [`CoreError::OutOfOrderEvent`] unless
    /// `event.seq_no` is exactly one greater than the last recorded number.
    pub fn append(&mut self, event: ProgressEvent) -> Result<(), CoreError> {
        let expected = self.next_seq();
        if event.seq_no != expected {
            return Err(CoreError::OutOfOrderEvent {
                expected,
                got: event.seq_no,
            });
        }
        self.events.push(event);
        Ok(())
    }

    /// The sequence number the next append must carry.
    pub fn next_seq(&self) -> i64 {
        self.events.last().map(|e| e.seq_no + 1).unwrap_or(1)
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(seq_no: i64) -> ProgressEvent {
        ProgressEvent {
            session_id: 1,
            seq_no,
            kind: ProgressEventKind::Reached,
            payload: EventPayload::default(),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn sequence_starts_at_one() {
        let ledger = Ledger::new();
        assert_eq!(ledger.next_seq(), 1);
    }

    #[test]
    fn gapless_appends_accepted() {
        let mut ledger = Ledger::new();
        ledger.append(event(1)).unwrap();
        ledger.append(event(2)).unwrap();
        ledger.append(event(3)).unwrap();
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn gap_rejected() {
        let mut ledger = Ledger::new();
        ledger.append(event(1)).unwrap();
        let err = ledger.append(event(3)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::OutOfOrderEvent {
                expected: 2,
                got: 3
            }
        ));
    }

    #[test]
    fn duplicate_sequence_rejected_not_reapplied() {
        let mut ledger = Ledger::new();
        ledger.append(event(1)).unwrap();
        assert!(ledger.append(event(1)).is_err());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            ProgressEventKind::Reached,
            ProgressEventKind::Answered,
            ProgressEventKind::BranchEntered,
            ProgressEventKind::BranchExited,
            ProgressEventKind::Resumed,
            ProgressEventKind::Completed,
        ] {
            assert_eq!(ProgressEventKind::parse(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn payload_omits_absent_fields() {
        let json = serde_json::to_value(EventPayload::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
