//! Transactional driver for playback session operations.
//!
//! Every operation follows the same shape: load the session snapshot, check
//! the caller's expected sequence number, rebuild the video's checkpoint
//! registry, run the state machine, then append the planned events and the
//! updated snapshot in one transaction. The `UNIQUE (session_id, seq_no)`
//! constraint on `progress_events` is the serialization point: of two
//! concurrent operations on the same session, exactly one commits and the
//! other surfaces as out-of-order.

use guidepost_core::error::CoreError;
use guidepost_core::ledger::ProgressEvent;
use guidepost_core::registry::CheckpointRegistry;
use guidepost_core::session::{
    ClipOutcome, Instruction, PlaybackSession, ResumeInfo, SessionMachine, SessionState,
    Transition,
};
use guidepost_core::types::DbId;
use guidepost_db::models::playback_session::PlaybackSessionRow;
use guidepost_db::models::video::Video;
use guidepost_db::repositories::{
    CheckpointRepo, ClipRepo, ProgressEventRepo, SessionRepo, VideoRepo,
};
use guidepost_events::{SessionSignal, SESSION_COMPLETED};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Result of one committed session operation.
#[derive(Debug)]
pub struct OperationOutcome {
    /// The session after the operation.
    pub session: PlaybackSession,
    /// What the client should do next.
    pub instruction: Instruction,
    /// The ledger events this operation appended, in order.
    pub appended: Vec<ProgressEvent>,
}

/// Runs playback operations against the database.
pub struct PlaybackEngine;

impl PlaybackEngine {
    /// Report playhead progress for a session.
    pub async fn advance(
        state: &AppState,
        session_id: DbId,
        expected_seq: i64,
        offset_secs: f64,
    ) -> AppResult<OperationOutcome> {
        Self::execute(state, session_id, expected_seq, |machine, session| {
            machine.advance(session, offset_secs, chrono::Utc::now())
        })
        .await
    }

    /// Answer the session's pending checkpoint.
    pub async fn answer(
        state: &AppState,
        session_id: DbId,
        expected_seq: i64,
        value: &str,
    ) -> AppResult<OperationOutcome> {
        Self::execute(state, session_id, expected_seq, |machine, session| {
            machine.answer(session, value, chrono::Utc::now())
        })
        .await
    }

    /// Finish the session's active remedial clip.
    pub async fn complete_clip(
        state: &AppState,
        session_id: DbId,
        expected_seq: i64,
        outcome: ClipOutcome,
    ) -> AppResult<OperationOutcome> {
        Self::execute(state, session_id, expected_seq, |machine, session| {
            machine.complete_clip(session, outcome, chrono::Utc::now())
        })
        .await
    }

    /// Where a re-attaching client should resume.
    ///
    /// The state is rebuilt by replaying the full ledger rather than trusting
    /// the snapshot; a divergence is logged and replay wins. The in-clip
    /// offset is a snapshot-only hint and is carried over from the row.
    pub async fn resume_info(state: &AppState, session_id: DbId) -> AppResult<ResumeInfo> {
        let row = Self::load_session(state, session_id).await?;
        let (_, registry) = Self::load_registry(state, row.video_id).await?;
        let machine = SessionMachine::new(&registry);

        let rows = ProgressEventRepo::list_for_session(&state.pool, session_id).await?;
        let events = rows
            .iter()
            .map(|r| r.to_domain())
            .collect::<Result<Vec<_>, _>>()?;

        let mut replayed = machine.replay(row.id, row.learner_id, row.video_id, &events)?;

        let snapshot = row.to_domain()?;
        if replayed.next_seq != snapshot.next_seq
            || (snapshot.state != SessionState::Abandoned && replayed.state != snapshot.state)
        {
            tracing::warn!(
                session_id,
                snapshot_state = snapshot.state.as_str(),
                replayed_state = replayed.state.as_str(),
                snapshot_next_seq = snapshot.next_seq,
                replayed_next_seq = replayed.next_seq,
                "Snapshot diverged from ledger, serving replayed state"
            );
        }
        replayed.clip_position_secs = snapshot.clip_position_secs;

        Ok(machine.resume_info(&replayed))
    }

    // -- internals -----------------------------------------------------------

    /// Load, transition, and commit one session operation.
    async fn execute<F>(
        state: &AppState,
        session_id: DbId,
        expected_seq: i64,
        op: F,
    ) -> AppResult<OperationOutcome>
    where
        F: FnOnce(&SessionMachine<'_>, &mut PlaybackSession) -> Result<Transition, CoreError>,
    {
        let row = Self::load_session(state, session_id).await?;
        let mut session = row.to_domain()?;

        check_expected_seq(expected_seq, session.next_seq)?;

        let (video, registry) = Self::load_registry(state, row.video_id).await?;
        let machine = SessionMachine::new(&registry);

        let transition = op(&machine, &mut session)?;

        let mut tx = state.pool.begin().await?;
        for event in &transition.events {
            ProgressEventRepo::append(&mut *tx, event).await?;
        }
        SessionRepo::update_snapshot(&mut *tx, &session).await?;
        tx.commit().await?;

        tracing::debug!(
            session_id,
            appended = transition.events.len(),
            state = session.state.as_str(),
            "Session operation committed"
        );

        if session.state == SessionState::Completed {
            state.event_bus.publish(
                SessionSignal::new(SESSION_COMPLETED, session.id, session.learner_id, video.id)
                    .with_notify_email(row.notify_email.clone())
                    .with_payload(serde_json::json!({ "video_title": video.title })),
            );
        }

        Ok(OperationOutcome {
            session,
            instruction: transition.instruction,
            appended: transition.events,
        })
    }

    /// Fetch the session row or 404.
    async fn load_session(state: &AppState, session_id: DbId) -> AppResult<PlaybackSessionRow> {
        SessionRepo::find_by_id(&state.pool, session_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "PlaybackSession",
                id: session_id,
            }))
    }

    /// Build the checkpoint registry for a video from its stored rows.
    pub async fn load_registry(
        state: &AppState,
        video_id: DbId,
    ) -> AppResult<(Video, CheckpointRegistry)> {
        let video = VideoRepo::find_by_id(&state.pool, video_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "PrimaryVideo",
                id: video_id,
            }))?;

        let checkpoints = CheckpointRepo::list_by_video(&state.pool, video_id)
            .await?
            .iter()
            .map(|c| c.to_domain())
            .collect::<Result<Vec<_>, _>>()?;

        let clips = ClipRepo::list_for_video(&state.pool, video_id)
            .await?
            .iter()
            .map(|c| c.to_domain())
            .collect();

        let registry = CheckpointRegistry::new(video.to_domain(), checkpoints, clips)?;
        Ok((video, registry))
    }
}

/// Reject stale clients before the state machine runs, so a retried or
/// duplicated operation plans nothing, let alone writes.
fn check_expected_seq(expected_seq: i64, next_seq: i64) -> Result<(), CoreError> {
    if expected_seq != next_seq {
        return Err(CoreError::OutOfOrderEvent {
            expected: next_seq,
            got: expected_seq,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn matching_sequence_number_accepted() {
        assert!(check_expected_seq(3, 3).is_ok());
    }

    #[test]
    fn duplicated_operation_rejected() {
        // A client retrying an acknowledged operation still carries the old
        // intended sequence number; the session has moved past it.
        let err = check_expected_seq(3, 4).unwrap_err();
        assert_matches!(err, CoreError::OutOfOrderEvent { expected: 4, got: 3 });
    }

    #[test]
    fn sequence_number_from_the_future_rejected() {
        let err = check_expected_seq(9, 4).unwrap_err();
        assert_matches!(err, CoreError::OutOfOrderEvent { expected: 4, got: 9 });
    }
}
