//! Repository for the `remedial_clips` table.

use guidepost_core::types::DbId;
use sqlx::PgPool;

use crate::models::remedial_clip::{CreateClip, RemedialClip};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, duration_secs, media_ref, created_at";

/// Provides authoring and lookup operations for remedial clips.
pub struct ClipRepo;

impl ClipRepo {
    /// Insert a new clip, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateClip) -> Result<RemedialClip, sqlx::Error> {
        let query = format!(
            "INSERT INTO remedial_clips (title, duration_secs, media_ref)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RemedialClip>(&query)
            .bind(&input.title)
            .bind(input.duration_secs)
            .bind(&input.media_ref)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<RemedialClip>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM remedial_clips WHERE id = $1");
        sqlx::query_as::<_, RemedialClip>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<RemedialClip>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM remedial_clips ORDER BY created_at DESC");
        sqlx::query_as::<_, RemedialClip>(&query)
            .fetch_all(pool)
            .await
    }

    /// Clips referenced by any checkpoint of the given video. Used to build
    /// the checkpoint registry for one session operation.
    pub async fn list_for_video(
        pool: &PgPool,
        video_id: DbId,
    ) -> Result<Vec<RemedialClip>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM remedial_clips
             WHERE id IN (
                 SELECT remedial_clip_id FROM checkpoints
                 WHERE video_id = $1 AND remedial_clip_id IS NOT NULL
             )"
        );
        sqlx::query_as::<_, RemedialClip>(&query)
            .bind(video_id)
            .fetch_all(pool)
            .await
    }
}
