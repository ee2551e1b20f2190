//! Playback session state machine.
//!
//! [`SessionMachine`] turns caller operations (`advance`, `answer`,
//! `complete_clip`) into ledger events and applies them to a
//! [`PlaybackSession`]. Commands are all-or-nothing: they either produce a
//! [`Transition`] whose events have been applied, or an error with no state
//! mutation at all.
//!
//! Live state and replayed state share one code path: commands plan events,
//! then fold them through the same `apply_event` used by
//! [`SessionMachine::replay`]. The ledger is therefore always sufficient to
//! rebuild the session.

use serde::Serialize;

use crate::error::CoreError;
use crate::ledger::{EventPayload, ProgressEvent, ProgressEventKind};
use crate::registry::CheckpointRegistry;
use crate::resolver::{self, Decision};
use crate::types::{DbId, LearnerId, Timestamp};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The five session states. `Completed` is terminal; `Abandoned` is a
/// liveness flag that any `advance`/`answer` lifts again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AtPrimary,
    AwaitingAnswer,
    InRemedial,
    Completed,
    Abandoned,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::AtPrimary => "at_primary",
            SessionState::AwaitingAnswer => "awaiting_answer",
            SessionState::InRemedial => "in_remedial",
            SessionState::Completed => "completed",
            SessionState::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "at_primary" => Ok(SessionState::AtPrimary),
            "awaiting_answer" => Ok(SessionState::AwaitingAnswer),
            "in_remedial" => Ok(SessionState::InRemedial),
            "completed" => Ok(SessionState::Completed),
            "abandoned" => Ok(SessionState::Abandoned),
            other => Err(CoreError::Validation(format!(
                "Unknown session state: {other}"
            ))),
        }
    }
}

/// Live playback session for one (learner, primary video) pair.
///
/// `position_secs` always equals the primary-video offset carried by the
/// last ledger event; fine-grained scrubbing between checkpoints stays on
/// the client. `clip_position_secs` is a snapshot-only playback hint and is
/// not part of the ledger-reconstructible state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSession {
    pub id: DbId,
    pub learner_id: LearnerId,
    pub video_id: DbId,
    pub state: SessionState,
    /// Offset into the primary video, in seconds.
    pub position_secs: f64,
    /// Offset into the active remedial clip; 0 outside a branch.
    pub clip_position_secs: f64,
    /// 0 = on primary, 1 = in a remedial clip. Never exceeds 1.
    pub branch_depth: i32,
    /// The checkpoint currently being resolved, if any.
    pub pending_checkpoint_id: Option<DbId>,
    /// The remedial clip currently playing, if any.
    pub active_clip_id: Option<DbId>,
    /// Sequence number the next ledger event must carry.
    pub next_seq: i64,
}

impl PlaybackSession {
    /// A fresh session at offset 0 on the primary video.
    pub fn new(id: DbId, learner_id: LearnerId, video_id: DbId) -> Self {
        Self {
            id,
            learner_id,
            video_id,
            state: SessionState::AtPrimary,
            position_secs: 0.0,
            clip_position_secs: 0.0,
            branch_depth: 0,
            pending_checkpoint_id: None,
            active_clip_id: None,
            next_seq: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

/// Reported remedial-clip outcome for `complete_clip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipOutcome {
    Pass,
    Fail,
}

impl ClipOutcome {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pass" => Ok(ClipOutcome::Pass),
            "fail" => Ok(ClipOutcome::Fail),
            other => Err(CoreError::Validation(format!(
                "Clip outcome must be 'pass' or 'fail', got '{other}'"
            ))),
        }
    }
}

/// What the caller should do next after a successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instruction {
    /// Keep playing the primary video.
    Continue,
    /// Parked at a required checkpoint; supply an answer.
    AwaitAnswer { checkpoint_id: DbId },
    /// Play the remedial clip; on exit playback lands at `resume_offset_secs`.
    EnterClip { clip_id: DbId, resume_offset_secs: f64 },
    /// Back on the primary video at the branch-entry offset.
    ResumeAt { offset_secs: f64 },
    /// The answer did not pass and no branch applies; answer again.
    Retry { checkpoint_id: DbId },
    /// The session is complete.
    Completed,
}

/// Result of one successful operation: the ledger events it appended (in
/// order) and the next instruction for the caller.
#[derive(Debug, Clone)]
pub struct Transition {
    pub events: Vec<ProgressEvent>,
    pub instruction: Instruction,
}

/// Where a re-attaching client should resume.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeInfo {
    pub state: SessionState,
    /// Primary-video offset playback will hold (or land at on clip exit).
    pub primary_offset_secs: f64,
    /// Set while in a remedial clip: the clip and the in-clip offset for
    /// immediate playback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_offset_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_checkpoint_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Drives a [`PlaybackSession`] against one video's [`CheckpointRegistry`].
pub struct SessionMachine<'a> {
    registry: &'a CheckpointRegistry,
}

impl<'a> SessionMachine<'a> {
    pub fn new(registry: &'a CheckpointRegistry) -> Self {
        Self { registry }
    }

    /// Advance playback to `offset_secs`.
    ///
    /// On the primary video this records `reached` for every checkpoint
    /// crossed, parks at the first blocking one, and completes the session
    /// when the end is reached with nothing unresolved. Inside a remedial
    /// clip it only tracks the in-clip offset. Rewinding on the primary
    /// video is rejected.
    pub fn advance(
        &self,
        session: &mut PlaybackSession,
        offset_secs: f64,
        now: Timestamp,
    ) -> Result<Transition, CoreError> {
        if !offset_secs.is_finite() || offset_secs < 0.0 {
            return Err(CoreError::Validation(format!(
                "Offset must be a non-negative number, got {offset_secs}"
            )));
        }

        let mut scratch = session.clone();
        let mut events = Vec::new();
        self.reactivate_if_abandoned(&mut scratch, &mut events, now)?;

        let instruction = match scratch.state {
            SessionState::AtPrimary => {
                self.advance_primary(&mut scratch, &mut events, offset_secs, now)?
            }
            SessionState::InRemedial => {
                let clip = self
                    .registry
                    .clip(scratch.active_clip_id.ok_or_else(|| {
                        CoreError::Internal("In-remedial session has no active clip".into())
                    })?)?;
                scratch.clip_position_secs = offset_secs.min(clip.duration_secs);
                Instruction::Continue
            }
            SessionState::AwaitingAnswer => {
                return Err(CoreError::InvalidTransition(format!(
                    "Checkpoint {} must be answered before advancing",
                    scratch.pending_checkpoint_id.unwrap_or_default()
                )));
            }
            SessionState::Completed => {
                return Err(CoreError::InvalidTransition(
                    "Session is already completed".into(),
                ));
            }
            SessionState::Abandoned => unreachable!("reactivated above"),
        };

        *session = scratch;
        Ok(Transition {
            events,
            instruction,
        })
    }

    /// Answer the pending checkpoint.
    pub fn answer(
        &self,
        session: &mut PlaybackSession,
        value: &str,
        now: Timestamp,
    ) -> Result<Transition, CoreError> {
        let mut scratch = session.clone();
        let mut events = Vec::new();
        self.reactivate_if_abandoned(&mut scratch, &mut events, now)?;

        match scratch.state {
            SessionState::AwaitingAnswer => {}
            SessionState::AtPrimary => {
                return Err(CoreError::InvalidTransition(
                    "No checkpoint is awaiting an answer".into(),
                ));
            }
            SessionState::InRemedial => {
                return Err(CoreError::InvalidTransition(
                    "Complete the remedial clip before answering".into(),
                ));
            }
            SessionState::Completed => {
                return Err(CoreError::InvalidTransition(
                    "Session is already completed".into(),
                ));
            }
            SessionState::Abandoned => unreachable!("reactivated above"),
        }

        let checkpoint_id = scratch.pending_checkpoint_id.ok_or_else(|| {
            CoreError::Internal("Awaiting-answer session has no pending checkpoint".into())
        })?;
        let checkpoint = self.registry.checkpoint(checkpoint_id)?;
        let passed = resolver::is_passing(checkpoint, value);
        let decision = resolver::resolve(checkpoint, value);

        let answered = EventPayload {
            checkpoint_id: Some(checkpoint_id),
            answer: Some(value.to_string()),
            passed: Some(passed),
            offset_secs: Some(checkpoint.offset_secs),
            ..Default::default()
        };

        let instruction = match decision {
            Decision::Proceed => {
                self.push(&mut scratch, &mut events, ProgressEventKind::Answered, answered, now)?;
                Instruction::Continue
            }
            Decision::Branch { clip_id } => {
                // Referential integrity was checked at registry build; this
                // lookup re-verifies before committing to the branch.
                self.registry.clip(clip_id)?;
                self.push(&mut scratch, &mut events, ProgressEventKind::Answered, answered, now)?;
                self.push(
                    &mut scratch,
                    &mut events,
                    ProgressEventKind::BranchEntered,
                    EventPayload {
                        checkpoint_id: Some(checkpoint_id),
                        clip_id: Some(clip_id),
                        offset_secs: Some(checkpoint.offset_secs),
                        ..Default::default()
                    },
                    now,
                )?;
                Instruction::EnterClip {
                    clip_id,
                    resume_offset_secs: checkpoint.offset_secs,
                }
            }
            Decision::BlockRequired => {
                self.push(&mut scratch, &mut events, ProgressEventKind::Answered, answered, now)?;
                Instruction::Retry { checkpoint_id }
            }
        };

        *session = scratch;
        Ok(Transition {
            events,
            instruction,
        })
    }

    /// Finish the active remedial clip with the reported outcome.
    ///
    /// A passing outcome counts as an implicit pass of the originating
    /// checkpoint; a failing one re-enters `AwaitingAnswer` for it. Either
    /// way playback returns to the branch-entry offset.
    pub fn complete_clip(
        &self,
        session: &mut PlaybackSession,
        outcome: ClipOutcome,
        now: Timestamp,
    ) -> Result<Transition, CoreError> {
        let mut scratch = session.clone();
        let mut events = Vec::new();
        self.reactivate_if_abandoned(&mut scratch, &mut events, now)?;

        if scratch.state != SessionState::InRemedial {
            return Err(CoreError::InvalidTransition(
                "No remedial clip is active".into(),
            ));
        }

        let clip_id = scratch.active_clip_id.ok_or_else(|| {
            CoreError::Internal("In-remedial session has no active clip".into())
        })?;
        let checkpoint_id = scratch.pending_checkpoint_id;
        let passed = outcome == ClipOutcome::Pass;
        let resume_offset = scratch.position_secs;

        self.push(
            &mut scratch,
            &mut events,
            ProgressEventKind::BranchExited,
            EventPayload {
                checkpoint_id,
                clip_id: Some(clip_id),
                passed: Some(passed),
                offset_secs: Some(resume_offset),
                ..Default::default()
            },
            now,
        )?;

        let instruction = if passed {
            Instruction::ResumeAt {
                offset_secs: resume_offset,
            }
        } else {
            Instruction::Retry {
                checkpoint_id: checkpoint_id.ok_or_else(|| {
                    CoreError::Internal("Branch has no originating checkpoint".into())
                })?,
            }
        };

        *session = scratch;
        Ok(Transition {
            events,
            instruction,
        })
    }

    /// Where a re-attaching client should resume (spec resume computation).
    pub fn resume_info(&self, session: &PlaybackSession) -> ResumeInfo {
        ResumeInfo {
            state: session.state,
            primary_offset_secs: session.position_secs,
            clip_id: session.active_clip_id,
            clip_offset_secs: session
                .active_clip_id
                .map(|_| session.clip_position_secs),
            pending_checkpoint_id: session.pending_checkpoint_id,
        }
    }

    /// Rebuild session state by folding the full event history, in order.
    ///
    /// The result equals the live session for every ledger-backed field;
    /// the in-clip offset and the advisory `Abandoned` flag are
    /// snapshot-only and come back as their defaults.
    pub fn replay(
        &self,
        id: DbId,
        learner_id: LearnerId,
        video_id: DbId,
        events: &[ProgressEvent],
    ) -> Result<PlaybackSession, CoreError> {
        let mut session = PlaybackSession::new(id, learner_id, video_id);
        for event in events {
            self.apply_event(&mut session, event)?;
        }
        Ok(session)
    }

    // -- internals -----------------------------------------------------------

    /// Advance within the primary video, recording crossed checkpoints.
    fn advance_primary(
        &self,
        scratch: &mut PlaybackSession,
        events: &mut Vec<ProgressEvent>,
        offset_secs: f64,
        now: Timestamp,
    ) -> Result<Instruction, CoreError> {
        if offset_secs < scratch.position_secs {
            return Err(CoreError::InvalidTransition(format!(
                "Cannot rewind from {}s to {}s",
                scratch.position_secs, offset_secs
            )));
        }

        let duration = self.registry.duration_secs();
        let target = offset_secs.min(duration);
        let start = scratch.position_secs;

        let crossed: Vec<DbId> = self
            .registry
            .checkpoints_in_range(start, target)
            .map(|cp| cp.id)
            .collect();

        for checkpoint_id in crossed {
            let checkpoint = self.registry.checkpoint(checkpoint_id)?;
            let blocking = checkpoint.blocks();
            self.push(
                scratch,
                events,
                ProgressEventKind::Reached,
                EventPayload {
                    checkpoint_id: Some(checkpoint_id),
                    offset_secs: Some(checkpoint.offset_secs),
                    ..Default::default()
                },
                now,
            )?;
            if blocking {
                // Advance beyond a required checkpoint is clamped to it.
                return Ok(Instruction::AwaitAnswer { checkpoint_id });
            }
        }

        if target >= duration {
            self.push(
                scratch,
                events,
                ProgressEventKind::Completed,
                EventPayload {
                    offset_secs: Some(duration),
                    ..Default::default()
                },
                now,
            )?;
            return Ok(Instruction::Completed);
        }

        Ok(Instruction::Continue)
    }

    /// If the session is abandoned, record `resumed` and restore the state
    /// implied by the snapshot's branch/pending fields.
    fn reactivate_if_abandoned(
        &self,
        scratch: &mut PlaybackSession,
        events: &mut Vec<ProgressEvent>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if scratch.state != SessionState::Abandoned {
            return Ok(());
        }
        self.push(
            scratch,
            events,
            ProgressEventKind::Resumed,
            EventPayload {
                offset_secs: Some(scratch.position_secs),
                ..Default::default()
            },
            now,
        )
    }

    /// Build the next event, apply it to `scratch`, and collect it.
    fn push(
        &self,
        scratch: &mut PlaybackSession,
        events: &mut Vec<ProgressEvent>,
        kind: ProgressEventKind,
        payload: EventPayload,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        let event = ProgressEvent {
            session_id: scratch.id,
            seq_no: scratch.next_seq,
            kind,
            payload,
            occurred_at: now,
        };
        self.apply_event(scratch, &event)?;
        events.push(event);
        Ok(())
    }

    /// Fold one event into the session. Shared by live transitions and
    /// [`replay`](Self::replay), which is what keeps the two equal.
    fn apply_event(
        &self,
        session: &mut PlaybackSession,
        event: &ProgressEvent,
    ) -> Result<(), CoreError> {
        if event.seq_no != session.next_seq {
            return Err(CoreError::OutOfOrderEvent {
                expected: session.next_seq,
                got: event.seq_no,
            });
        }

        match event.kind {
            ProgressEventKind::Reached => {
                let checkpoint_id = event.payload.checkpoint_id.ok_or_else(|| {
                    CoreError::Internal("Reached event without checkpoint id".into())
                })?;
                let checkpoint = self.registry.checkpoint(checkpoint_id)?;
                if checkpoint.blocks() {
                    session.state = SessionState::AwaitingAnswer;
                    session.pending_checkpoint_id = Some(checkpoint_id);
                }
                session.position_secs = event
                    .payload
                    .offset_secs
                    .unwrap_or(checkpoint.offset_secs);
            }
            ProgressEventKind::Answered => {
                if event.payload.passed.unwrap_or(false) {
                    session.state = SessionState::AtPrimary;
                    session.pending_checkpoint_id = None;
                } else {
                    // A branch-entered event may follow; until then the
                    // checkpoint stays pending.
                    session.state = SessionState::AwaitingAnswer;
                }
            }
            ProgressEventKind::BranchEntered => {
                session.state = SessionState::InRemedial;
                session.branch_depth = 1;
                session.active_clip_id = event.payload.clip_id;
                session.clip_position_secs = 0.0;
                if let Some(offset) = event.payload.offset_secs {
                    session.position_secs = offset;
                }
            }
            ProgressEventKind::BranchExited => {
                session.branch_depth = 0;
                session.active_clip_id = None;
                session.clip_position_secs = 0.0;
                if event.payload.passed.unwrap_or(false) {
                    session.state = SessionState::AtPrimary;
                    session.pending_checkpoint_id = None;
                } else {
                    session.state = SessionState::AwaitingAnswer;
                }
                if let Some(offset) = event.payload.offset_secs {
                    session.position_secs = offset;
                }
            }
            ProgressEventKind::Resumed => {
                session.state = if session.active_clip_id.is_some() {
                    SessionState::InRemedial
                } else if session.pending_checkpoint_id.is_some() {
                    SessionState::AwaitingAnswer
                } else {
                    SessionState::AtPrimary
                };
            }
            ProgressEventKind::Completed => {
                session.state = SessionState::Completed;
                session.pending_checkpoint_id = None;
                if let Some(offset) = event.payload.offset_secs {
                    session.position_secs = offset;
                }
            }
        }

        session.next_seq = event.seq_no + 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Checkpoint, CheckpointKind, PrimaryVideo, RemedialClip};
    use chrono::Utc;
    use uuid::Uuid;

    const VIDEO_ID: DbId = 1;
    const PROMPT_CP: DbId = 10;
    const GATE_CP: DbId = 30;
    const CLIP_ID: DbId = 7;
    const DURATION: f64 = 100.0;

    /// Video with an optional prompt at t=10 and a required gate at t=30
    /// backed by remedial clip 7 with pass answer "correct".
    fn scenario_registry() -> CheckpointRegistry {
        CheckpointRegistry::new(
            PrimaryVideo {
                id: VIDEO_ID,
                duration_secs: DURATION,
            },
            vec![
                Checkpoint {
                    id: PROMPT_CP,
                    video_id: VIDEO_ID,
                    offset_secs: 10.0,
                    kind: CheckpointKind::Prompt,
                    required: false,
                    remedial_clip_id: None,
                    pass_answer: None,
                },
                Checkpoint {
                    id: GATE_CP,
                    video_id: VIDEO_ID,
                    offset_secs: 30.0,
                    kind: CheckpointKind::Gate,
                    required: true,
                    remedial_clip_id: Some(CLIP_ID),
                    pass_answer: Some("correct".to_string()),
                },
            ],
            vec![RemedialClip {
                id: CLIP_ID,
                duration_secs: 20.0,
            }],
        )
        .unwrap()
    }

    fn session() -> PlaybackSession {
        PlaybackSession::new(100, Uuid::nil(), VIDEO_ID)
    }

    /// Assert the live session equals a replay of `history`, modulo the
    /// snapshot-only fields (abandoned flag, in-clip offset).
    fn assert_replay_matches(
        registry: &CheckpointRegistry,
        live: &PlaybackSession,
        history: &[ProgressEvent],
    ) {
        let machine = SessionMachine::new(registry);
        let replayed = machine
            .replay(live.id, live.learner_id, live.video_id, history)
            .unwrap();
        assert_eq!(replayed.state, live.state);
        assert_eq!(replayed.position_secs, live.position_secs);
        assert_eq!(replayed.branch_depth, live.branch_depth);
        assert_eq!(replayed.pending_checkpoint_id, live.pending_checkpoint_id);
        assert_eq!(replayed.active_clip_id, live.active_clip_id);
        assert_eq!(replayed.next_seq, live.next_seq);
    }

    fn kinds(events: &[ProgressEvent]) -> Vec<ProgressEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    // -- the full specification scenario -------------------------------------

    #[test]
    fn full_branching_scenario() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let mut history = Vec::new();
        let now = Utc::now();

        // advance to 15: crosses the optional prompt, keeps playing.
        let t = machine.advance(&mut s, 15.0, now).unwrap();
        assert_eq!(kinds(&t.events), vec![ProgressEventKind::Reached]);
        assert_eq!(t.events[0].payload.checkpoint_id, Some(PROMPT_CP));
        assert_eq!(t.instruction, Instruction::Continue);
        assert_eq!(s.state, SessionState::AtPrimary);
        history.extend(t.events);
        assert_replay_matches(&registry, &s, &history);

        // advance to 35: parked at the gate, clamped to 30.
        let t = machine.advance(&mut s, 35.0, now).unwrap();
        assert_eq!(kinds(&t.events), vec![ProgressEventKind::Reached]);
        assert_eq!(
            t.instruction,
            Instruction::AwaitAnswer {
                checkpoint_id: GATE_CP
            }
        );
        assert_eq!(s.state, SessionState::AwaitingAnswer);
        assert_eq!(s.position_secs, 30.0);
        history.extend(t.events);
        assert_replay_matches(&registry, &s, &history);

        // wrong answer: branch into the remedial clip.
        let t = machine.answer(&mut s, "wrong", now).unwrap();
        assert_eq!(
            kinds(&t.events),
            vec![
                ProgressEventKind::Answered,
                ProgressEventKind::BranchEntered
            ]
        );
        assert_eq!(
            t.instruction,
            Instruction::EnterClip {
                clip_id: CLIP_ID,
                resume_offset_secs: 30.0
            }
        );
        assert_eq!(s.state, SessionState::InRemedial);
        assert_eq!(s.branch_depth, 1);
        history.extend(t.events);
        assert_replay_matches(&registry, &s, &history);

        // clip passes: back on the primary video at the branch-entry offset.
        let t = machine.complete_clip(&mut s, ClipOutcome::Pass, now).unwrap();
        assert_eq!(kinds(&t.events), vec![ProgressEventKind::BranchExited]);
        assert_eq!(
            t.instruction,
            Instruction::ResumeAt { offset_secs: 30.0 }
        );
        assert_eq!(s.state, SessionState::AtPrimary);
        assert_eq!(s.position_secs, 30.0);
        assert_eq!(s.branch_depth, 0);
        assert_eq!(s.pending_checkpoint_id, None);
        history.extend(t.events);
        assert_replay_matches(&registry, &s, &history);

        // advance to the end: completed.
        let t = machine.advance(&mut s, DURATION, now).unwrap();
        assert_eq!(kinds(&t.events), vec![ProgressEventKind::Completed]);
        assert_eq!(t.instruction, Instruction::Completed);
        assert_eq!(s.state, SessionState::Completed);
        history.extend(t.events);
        assert_replay_matches(&registry, &s, &history);

        // sequence numbers are exactly 1..n, gapless.
        let seqs: Vec<i64> = history.iter().map(|e| e.seq_no).collect();
        assert_eq!(seqs, (1..=history.len() as i64).collect::<Vec<_>>());
    }

    // -- advance -------------------------------------------------------------

    #[test]
    fn advance_without_checkpoint_appends_nothing() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();

        let t = machine.advance(&mut s, 5.0, Utc::now()).unwrap();
        assert!(t.events.is_empty());
        assert_eq!(t.instruction, Instruction::Continue);
        // Durable position only moves with ledger events.
        assert_eq!(s.position_secs, 0.0);
        assert_eq!(s.next_seq, 1);
    }

    #[test]
    fn advance_crossing_both_checkpoints_parks_at_gate() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();

        let t = machine.advance(&mut s, 50.0, Utc::now()).unwrap();
        assert_eq!(
            kinds(&t.events),
            vec![ProgressEventKind::Reached, ProgressEventKind::Reached]
        );
        assert_eq!(s.state, SessionState::AwaitingAnswer);
        assert_eq!(s.position_secs, 30.0);
    }

    #[test]
    fn advance_to_duration_blocked_by_unresolved_gate() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();

        let t = machine.advance(&mut s, DURATION, Utc::now()).unwrap();
        // Parked at the gate, not completed.
        assert_eq!(t.instruction, Instruction::AwaitAnswer { checkpoint_id: GATE_CP });
        assert_eq!(s.state, SessionState::AwaitingAnswer);
    }

    #[test]
    fn advance_rejects_rewind() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        machine.advance(&mut s, 15.0, Utc::now()).unwrap();
        let before = s.clone();

        let err = machine.advance(&mut s, 5.0, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
        // All-or-nothing: no partial mutation.
        assert_eq!(s, before);
    }

    #[test]
    fn advance_rejects_negative_offset() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        assert!(machine.advance(&mut s, -1.0, Utc::now()).is_err());
    }

    #[test]
    fn advance_while_awaiting_answer_rejected() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        machine.advance(&mut s, 35.0, Utc::now()).unwrap();
        let before = s.clone();

        let err = machine.advance(&mut s, 40.0, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
        assert_eq!(s, before);
    }

    #[test]
    fn advance_in_remedial_tracks_clip_offset_only() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let now = Utc::now();
        machine.advance(&mut s, 35.0, now).unwrap();
        machine.answer(&mut s, "wrong", now).unwrap();
        let seq_before = s.next_seq;

        let t = machine.advance(&mut s, 12.0, now).unwrap();
        assert!(t.events.is_empty());
        assert_eq!(s.clip_position_secs, 12.0);
        assert_eq!(s.position_secs, 30.0);
        assert_eq!(s.next_seq, seq_before);

        // Clamped to the clip duration (20s).
        machine.advance(&mut s, 60.0, now).unwrap();
        assert_eq!(s.clip_position_secs, 20.0);
    }

    // -- answer --------------------------------------------------------------

    #[test]
    fn answer_while_at_primary_rejected() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let err = machine.answer(&mut s, "correct", Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
    }

    #[test]
    fn passing_answer_clears_pending_checkpoint() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let now = Utc::now();
        machine.advance(&mut s, 35.0, now).unwrap();

        let t = machine.answer(&mut s, "correct", now).unwrap();
        assert_eq!(kinds(&t.events), vec![ProgressEventKind::Answered]);
        assert_eq!(t.events[0].payload.passed, Some(true));
        assert_eq!(s.state, SessionState::AtPrimary);
        assert_eq!(s.pending_checkpoint_id, None);
        assert_eq!(s.position_secs, 30.0);
    }

    #[test]
    fn failing_answer_without_clip_blocks_and_allows_retry() {
        // Gate with no remedial clip configured.
        let registry = CheckpointRegistry::new(
            PrimaryVideo {
                id: VIDEO_ID,
                duration_secs: DURATION,
            },
            vec![Checkpoint {
                id: GATE_CP,
                video_id: VIDEO_ID,
                offset_secs: 30.0,
                kind: CheckpointKind::Gate,
                required: true,
                remedial_clip_id: None,
                pass_answer: Some("correct".to_string()),
            }],
            vec![],
        )
        .unwrap();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let now = Utc::now();
        machine.advance(&mut s, 35.0, now).unwrap();

        let t = machine.answer(&mut s, "wrong", now).unwrap();
        assert_eq!(t.instruction, Instruction::Retry { checkpoint_id: GATE_CP });
        assert_eq!(s.state, SessionState::AwaitingAnswer);

        // Retry with the right answer passes.
        let t = machine.answer(&mut s, "correct", now).unwrap();
        assert_eq!(t.instruction, Instruction::Continue);
        assert_eq!(s.state, SessionState::AtPrimary);
    }

    // -- complete_clip ---------------------------------------------------------

    #[test]
    fn complete_clip_outside_branch_rejected() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let err = machine
            .complete_clip(&mut s, ClipOutcome::Pass, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
    }

    #[test]
    fn failing_clip_reenters_awaiting_answer() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let now = Utc::now();
        machine.advance(&mut s, 35.0, now).unwrap();
        machine.answer(&mut s, "wrong", now).unwrap();

        let t = machine.complete_clip(&mut s, ClipOutcome::Fail, now).unwrap();
        assert_eq!(t.instruction, Instruction::Retry { checkpoint_id: GATE_CP });
        assert_eq!(s.state, SessionState::AwaitingAnswer);
        assert_eq!(s.pending_checkpoint_id, Some(GATE_CP));
        assert_eq!(s.branch_depth, 0);
    }

    #[test]
    fn branch_depth_never_exceeds_one() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let now = Utc::now();
        machine.advance(&mut s, 35.0, now).unwrap();

        // Fail, branch, fail the clip, fail again, branch again.
        machine.answer(&mut s, "wrong", now).unwrap();
        assert_eq!(s.branch_depth, 1);
        machine.complete_clip(&mut s, ClipOutcome::Fail, now).unwrap();
        assert_eq!(s.branch_depth, 0);
        machine.answer(&mut s, "still wrong", now).unwrap();
        assert_eq!(s.branch_depth, 1);
    }

    // -- abandonment -----------------------------------------------------------

    #[test]
    fn abandoned_session_reactivates_on_advance() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let now = Utc::now();
        machine.advance(&mut s, 15.0, now).unwrap();
        s.state = SessionState::Abandoned; // the background sweep's doing

        let t = machine.advance(&mut s, 20.0, now).unwrap();
        assert_eq!(kinds(&t.events), vec![ProgressEventKind::Resumed]);
        assert_eq!(s.state, SessionState::AtPrimary);
        assert_eq!(s.position_secs, 10.0);
    }

    #[test]
    fn abandoned_mid_remedial_restores_clip_state() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let now = Utc::now();
        machine.advance(&mut s, 35.0, now).unwrap();
        machine.answer(&mut s, "wrong", now).unwrap();
        machine.advance(&mut s, 8.0, now).unwrap(); // in-clip offset
        s.state = SessionState::Abandoned;

        // complete_clip reactivates and applies in the restored state.
        let t = machine.complete_clip(&mut s, ClipOutcome::Pass, now).unwrap();
        assert_eq!(
            kinds(&t.events),
            vec![ProgressEventKind::Resumed, ProgressEventKind::BranchExited]
        );
        assert_eq!(s.state, SessionState::AtPrimary);
        assert_eq!(s.position_secs, 30.0);
    }

    #[test]
    fn abandoned_awaiting_answer_still_rejects_advance() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let now = Utc::now();
        machine.advance(&mut s, 35.0, now).unwrap();
        s.state = SessionState::Abandoned;
        let before = s.clone();

        let err = machine.advance(&mut s, 40.0, now).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
        assert_eq!(s, before);
    }

    // -- resume info -----------------------------------------------------------

    #[test]
    fn resume_info_in_remedial_reports_both_offsets() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let now = Utc::now();
        machine.advance(&mut s, 35.0, now).unwrap();
        machine.answer(&mut s, "wrong", now).unwrap();
        machine.advance(&mut s, 8.0, now).unwrap();

        let info = machine.resume_info(&s);
        assert_eq!(info.state, SessionState::InRemedial);
        assert_eq!(info.primary_offset_secs, 30.0);
        assert_eq!(info.clip_id, Some(CLIP_ID));
        assert_eq!(info.clip_offset_secs, Some(8.0));
    }

    // -- replay guards ---------------------------------------------------------

    #[test]
    fn replay_rejects_gapped_history() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let t = machine.advance(&mut s, 15.0, Utc::now()).unwrap();

        let mut gapped = t.events.clone();
        gapped[0].seq_no = 2;
        let err = machine
            .replay(s.id, s.learner_id, s.video_id, &gapped)
            .unwrap_err();
        assert!(matches!(err, CoreError::OutOfOrderEvent { .. }));
    }

    #[test]
    fn completed_session_rejects_everything() {
        let registry = scenario_registry();
        let machine = SessionMachine::new(&registry);
        let mut s = session();
        let now = Utc::now();
        machine.advance(&mut s, 35.0, now).unwrap();
        machine.answer(&mut s, "correct", now).unwrap();
        machine.advance(&mut s, DURATION, now).unwrap();
        assert_eq!(s.state, SessionState::Completed);

        assert!(machine.advance(&mut s, DURATION, now).is_err());
        assert!(machine.answer(&mut s, "x", now).is_err());
        assert!(machine.complete_clip(&mut s, ClipOutcome::Pass, now).is_err());
    }
}
