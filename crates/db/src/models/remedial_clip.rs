//! Remedial clip entity model.

use guidepost_core::registry::RemedialClip as DomainClip;
use guidepost_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `remedial_clips` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RemedialClip {
    pub id: DbId,
    pub title: String,
    pub duration_secs: f64,
    pub media_ref: String,
    pub created_at: Timestamp,
}

impl RemedialClip {
    pub fn to_domain(&self) -> DomainClip {
        DomainClip {
            id: self.id,
            duration_secs: self.duration_secs,
        }
    }
}

/// DTO for creating a new remedial clip.
#[derive(Debug, Deserialize)]
pub struct CreateClip {
    pub title: String,
    pub duration_secs: f64,
    pub media_ref: String,
}
