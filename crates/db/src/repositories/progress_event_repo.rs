//! Repository for the `progress_events` ledger table.

use guidepost_core::ledger::ProgressEvent;
use guidepost_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::progress_event::ProgressEventRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, seq_no, kind, payload, occurred_at";

/// Provides append and replay access to the progress ledger.
pub struct ProgressEventRepo;

impl ProgressEventRepo {
    /// Append one event inside the caller's transaction.
    ///
    /// `uq_progress_events_session_seq` enforces the gapless-sequence
    /// contract against concurrent writers; a violation bubbles up as a
    /// database error the api layer classifies as out-of-order.
    pub async fn append(
        conn: &mut PgConnection,
        event: &ProgressEvent,
    ) -> Result<DbId, sqlx::Error> {
        let payload = serde_json::to_value(&event.payload)
            .unwrap_or(serde_json::Value::Object(Default::default()));
        sqlx::query_scalar(
            "INSERT INTO progress_events (session_id, seq_no, kind, payload, occurred_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(event.session_id)
        .bind(event.seq_no)
        .bind(event.kind.as_str())
        .bind(payload)
        .bind(event.occurred_at)
        .fetch_one(conn)
        .await
    }

    /// Whether any recorded event of the video's sessions references the
    /// checkpoint. Payloads carry checkpoint ids as JSONB, not foreign keys,
    /// so this is the only way to know a delete would break replay.
    pub async fn checkpoint_referenced(
        pool: &PgPool,
        video_id: DbId,
        checkpoint_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM progress_events pe
                 JOIN playback_sessions ps ON ps.id = pe.session_id
                 WHERE ps.video_id = $1
                   AND (pe.payload ->> 'checkpoint_id')::bigint = $2
             )",
        )
        .bind(video_id)
        .bind(checkpoint_id)
        .fetch_one(pool)
        .await
    }

    /// Full event history for a session in sequence order, for replay.
    pub async fn list_for_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<ProgressEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM progress_events WHERE session_id = $1 ORDER BY seq_no"
        );
        sqlx::query_as::<_, ProgressEventRow>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }
}
