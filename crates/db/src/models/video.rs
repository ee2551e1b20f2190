//! Primary video entity model.

use guidepost_core::registry::PrimaryVideo;
use guidepost_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `primary_videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Video {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub duration_secs: f64,
    /// Content-store identifier resolved to a playable URL elsewhere.
    pub media_ref: String,
    pub total_views: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Video {
    /// The slice of this row the state machine cares about.
    pub fn to_domain(&self) -> PrimaryVideo {
        PrimaryVideo {
            id: self.id,
            duration_secs: self.duration_secs,
        }
    }
}

/// DTO for creating a new primary video.
#[derive(Debug, Deserialize)]
pub struct CreateVideo {
    pub title: String,
    pub description: Option<String>,
    pub duration_secs: f64,
    pub media_ref: String,
}
