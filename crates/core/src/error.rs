use crate::types::DbId;

/// Domain error taxonomy for playback sessions.
///
/// `InvalidTransition` and `OutOfOrderEvent` are caller-recoverable and leave
/// the session untouched. `UnknownCheckpoint`/`UnknownClip` indicate broken
/// content references and block the session until authoring fixes them.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Out-of-order event: expected sequence {expected}, got {got}")]
    OutOfOrderEvent { expected: i64, got: i64 },

    #[error("Unknown checkpoint: {0}")]
    UnknownCheckpoint(DbId),

    #[error("Unknown remedial clip: {0}")]
    UnknownClip(DbId),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
