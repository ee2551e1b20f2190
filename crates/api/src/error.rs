use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use guidepost_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `guidepost_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A request that conflicts with recorded state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::InvalidTransition(msg) => {
                    (StatusCode::CONFLICT, "INVALID_TRANSITION", msg.clone())
                }
                CoreError::OutOfOrderEvent { expected, got } => (
                    StatusCode::CONFLICT,
                    "OUT_OF_ORDER",
                    format!("Expected sequence number {expected}, got {got}"),
                ),
                CoreError::UnknownCheckpoint(id) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "UNKNOWN_CHECKPOINT",
                    format!("Checkpoint {id} is not registered for this video"),
                ),
                CoreError::UnknownClip(id) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "UNKNOWN_CLIP",
                    format!("Remedial clip {id} is not registered for this video"),
                ),
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        // Every rejected operation states that no transition was recorded,
        // so clients can distinguish "nothing happened" from partial effects.
        let body = json!({
            "error": message,
            "code": code,
            "state_changed": false,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - A unique violation on `uq_progress_events_session_seq` is the database
///   catching a concurrent writer on the same session; it maps to 409
///   `OUT_OF_ORDER` exactly like the in-memory sequence check.
/// - Other unique constraint violations (constraint name starting with
///   `uq_`) map to 409 `CONFLICT`.
/// - Everything else is a transient persistence failure; map to 503 so the
///   caller retries with backoff.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint == "uq_progress_events_session_seq" {
                    return (
                        StatusCode::CONFLICT,
                        "OUT_OF_ORDER",
                        "A concurrent operation already recorded this sequence number"
                            .to_string(),
                    );
                }
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "PERSISTENCE_FAILURE",
                "Persistence temporarily unavailable, retry with backoff".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "PERSISTENCE_FAILURE",
                "Persistence temporarily unavailable, retry with backoff".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn invalid_transition_maps_to_conflict() {
        let err = AppError::Core(CoreError::InvalidTransition("answer while at-primary".into()));
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn out_of_order_maps_to_conflict() {
        let err = AppError::Core(CoreError::OutOfOrderEvent {
            expected: 4,
            got: 2,
        });
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn unknown_checkpoint_maps_to_unprocessable() {
        let err = AppError::Core(CoreError::UnknownCheckpoint(9));
        assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn unknown_clip_maps_to_unprocessable() {
        let err = AppError::Core(CoreError::UnknownClip(3));
        assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::Core(CoreError::NotFound {
            entity: "PlaybackSession",
            id: 42,
        });
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_400() {
        let err = AppError::Core(CoreError::Validation("offset must be finite".into()));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn generic_db_error_maps_to_503() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(status_of(err), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn bad_request_maps_to_400() {
        let err = AppError::BadRequest("expected_seq is required".into());
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_maps_to_409() {
        let err = AppError::Conflict("checkpoint is referenced by recorded progress".into());
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }
}
