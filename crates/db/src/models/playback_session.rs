//! Playback session snapshot model.
//!
//! The snapshot is a cache of the state the progress ledger implies; the
//! ledger wins whenever the two could disagree.

use guidepost_core::error::CoreError;
use guidepost_core::session::{PlaybackSession, SessionState};
use guidepost_core::types::{DbId, LearnerId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `playback_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PlaybackSessionRow {
    pub id: DbId,
    pub learner_id: LearnerId,
    pub video_id: DbId,
    pub state: String,
    pub position_secs: f64,
    pub clip_position_secs: f64,
    pub branch_depth: i32,
    pub pending_checkpoint_id: Option<DbId>,
    pub active_clip_id: Option<DbId>,
    pub next_seq: i64,
    /// Optional address for the completion notification.
    pub notify_email: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PlaybackSessionRow {
    pub fn to_domain(&self) -> Result<PlaybackSession, CoreError> {
        Ok(PlaybackSession {
            id: self.id,
            learner_id: self.learner_id,
            video_id: self.video_id,
            state: SessionState::parse(&self.state)?,
            position_secs: self.position_secs,
            clip_position_secs: self.clip_position_secs,
            branch_depth: self.branch_depth,
            pending_checkpoint_id: self.pending_checkpoint_id,
            active_clip_id: self.active_clip_id,
            next_seq: self.next_seq,
        })
    }
}
