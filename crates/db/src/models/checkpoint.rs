//! Checkpoint entity model.

use guidepost_core::error::CoreError;
use guidepost_core::registry::{Checkpoint as DomainCheckpoint, CheckpointKind};
use guidepost_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `checkpoints` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Checkpoint {
    pub id: DbId,
    pub video_id: DbId,
    pub offset_secs: f64,
    /// One of `question`, `prompt`, `gate`.
    pub kind: String,
    pub required: bool,
    /// Question or prompt text surfaced to the learner.
    pub prompt: String,
    pub remedial_clip_id: Option<DbId>,
    pub pass_answer: Option<String>,
    pub created_at: Timestamp,
}

impl Checkpoint {
    pub fn to_domain(&self) -> Result<DomainCheckpoint, CoreError> {
        Ok(DomainCheckpoint {
            id: self.id,
            video_id: self.video_id,
            offset_secs: self.offset_secs,
            kind: CheckpointKind::parse(&self.kind)?,
            required: self.required,
            remedial_clip_id: self.remedial_clip_id,
            pass_answer: self.pass_answer.clone(),
        })
    }
}

/// DTO for creating a new checkpoint.
#[derive(Debug, Deserialize)]
pub struct CreateCheckpoint {
    pub video_id: DbId,
    pub offset_secs: f64,
    pub kind: CheckpointKind,
    pub required: bool,
    pub prompt: String,
    pub remedial_clip_id: Option<DbId>,
    pub pass_answer: Option<String>,
}
