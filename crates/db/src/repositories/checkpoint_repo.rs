//! Repository for the `checkpoints` table.

use guidepost_core::types::DbId;
use sqlx::PgPool;

use crate::models::checkpoint::{Checkpoint, CreateCheckpoint};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, video_id, offset_secs, kind, required, prompt, \
                       remedial_clip_id, pass_answer, created_at";

/// Provides authoring and lookup operations for checkpoints.
///
/// Offset uniqueness per video is enforced by
/// `uq_checkpoints_video_offset`; a duplicate insert surfaces as a
/// conflict to the caller.
pub struct CheckpointRepo;

impl CheckpointRepo {
    /// Insert a new checkpoint, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateCheckpoint,
    ) -> Result<Checkpoint, sqlx::Error> {
        let query = format!(
            "INSERT INTO checkpoints
                 (video_id, offset_secs, kind, required, prompt, remedial_clip_id, pass_answer)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Checkpoint>(&query)
            .bind(input.video_id)
            .bind(input.offset_secs)
            .bind(input.kind.as_str())
            .bind(input.required)
            .bind(&input.prompt)
            .bind(&input.remedial_clip_id)
            .bind(&input.pass_answer)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Checkpoint>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM checkpoints WHERE id = $1");
        sqlx::query_as::<_, Checkpoint>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All checkpoints for a video, ordered by offset.
    pub async fn list_by_video(
        pool: &PgPool,
        video_id: DbId,
    ) -> Result<Vec<Checkpoint>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM checkpoints WHERE video_id = $1 ORDER BY offset_secs");
        sqlx::query_as::<_, Checkpoint>(&query)
            .bind(video_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a checkpoint. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM checkpoints WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
