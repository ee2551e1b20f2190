//! Route definitions for playback session operations.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::playback;
use crate::state::AppState;

/// Session routes mounted at `/sessions`.
///
/// ```text
/// POST /                      -> start_or_resume
/// GET  /{id}                  -> get_session
/// POST /{id}/advance          -> advance
/// POST /{id}/answer           -> answer
/// POST /{id}/complete-clip    -> complete_clip
/// GET  /{id}/resume-info      -> resume_info
/// GET  /{id}/events           -> list_events
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(playback::start_or_resume))
        .route("/{id}", get(playback::get_session))
        .route("/{id}/advance", post(playback::advance))
        .route("/{id}/answer", post(playback::answer))
        .route("/{id}/complete-clip", post(playback::complete_clip))
        .route("/{id}/resume-info", get(playback::resume_info))
        .route("/{id}/events", get(playback::list_events))
}
