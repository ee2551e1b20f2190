//! Progress event row model.

use guidepost_core::error::CoreError;
use guidepost_core::ledger::{EventPayload, ProgressEvent, ProgressEventKind};
use guidepost_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `progress_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProgressEventRow {
    pub id: DbId,
    pub session_id: DbId,
    pub seq_no: i64,
    pub kind: String,
    pub payload: serde_json::Value,
    pub occurred_at: Timestamp,
}

impl ProgressEventRow {
    pub fn to_domain(&self) -> Result<ProgressEvent, CoreError> {
        let payload: EventPayload = serde_json::from_value(self.payload.clone())
            .map_err(|e| CoreError::Internal(format!("Malformed event payload: {e}")))?;
        Ok(ProgressEvent {
            session_id: self.session_id,
            seq_no: self.seq_no,
            kind: ProgressEventKind::parse(&self.kind)?,
            payload,
            occurred_at: self.occurred_at,
        })
    }
}
