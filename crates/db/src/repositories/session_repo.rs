//! Repository for the `playback_sessions` table.

use guidepost_core::session::PlaybackSession;
use guidepost_core::types::{DbId, LearnerId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::playback_session::PlaybackSessionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, learner_id, video_id, state, position_secs, clip_position_secs, \
                       branch_depth, pending_checkpoint_id, active_clip_id, next_seq, \
                       notify_email, created_at, updated_at";

/// Provides snapshot operations for playback sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Create a fresh session for a (learner, video) pair.
    ///
    /// The partial unique index `uq_playback_sessions_active` rejects a
    /// second non-completed session for the same pair.
    pub async fn create(
        pool: &PgPool,
        learner_id: LearnerId,
        video_id: DbId,
        notify_email: Option<&str>,
    ) -> Result<PlaybackSessionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO playback_sessions (learner_id, video_id, notify_email)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PlaybackSessionRow>(&query)
            .bind(learner_id)
            .bind(video_id)
            .bind(notify_email)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PlaybackSessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM playback_sessions WHERE id = $1");
        sqlx::query_as::<_, PlaybackSessionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The non-completed session for a (learner, video) pair, if any.
    /// Abandoned sessions count: they are resumable.
    pub async fn find_active_for_pair(
        pool: &PgPool,
        learner_id: LearnerId,
        video_id: DbId,
    ) -> Result<Option<PlaybackSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM playback_sessions
             WHERE learner_id = $1 AND video_id = $2 AND state <> 'completed'"
        );
        sqlx::query_as::<_, PlaybackSessionRow>(&query)
            .bind(learner_id)
            .bind(video_id)
            .fetch_optional(pool)
            .await
    }

    /// Write the session snapshot derived from the state machine. Runs
    /// inside the caller's transaction, atomically with the event append.
    pub async fn update_snapshot(
        conn: &mut PgConnection,
        session: &PlaybackSession,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE playback_sessions
             SET state = $2,
                 position_secs = $3,
                 clip_position_secs = $4,
                 branch_depth = $5,
                 pending_checkpoint_id = $6,
                 active_clip_id = $7,
                 next_seq = $8,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(session.id)
        .bind(session.state.as_str())
        .bind(session.position_secs)
        .bind(session.clip_position_secs)
        .bind(session.branch_depth)
        .bind(session.pending_checkpoint_id)
        .bind(session.active_clip_id)
        .bind(session.next_seq)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Mark live sessions idle since before `cutoff` as abandoned.
    /// Advisory only: no ledger event, nothing erased. Returns the count.
    pub async fn sweep_abandoned(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE playback_sessions
             SET state = 'abandoned', updated_at = NOW()
             WHERE state IN ('at_primary', 'awaiting_answer', 'in_remedial')
               AND updated_at < $1",
        )
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
