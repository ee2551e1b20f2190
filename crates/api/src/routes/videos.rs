//! Route definitions for the video catalog and checkpoint authoring.
//!
//! Two routers are provided:
//! - `video_router()` for video and checkpoint routes mounted at `/videos`
//! - `clip_router()` for remedial clip routes mounted at `/clips`

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{clips, videos};
use crate::state::AppState;

/// Video catalog routes mounted at `/videos`.
///
/// ```text
/// GET    /                                  -> list_videos
/// POST   /                                  -> create_video
/// GET    /{id}                              -> get_video
/// GET    /{video_id}/checkpoints            -> list_checkpoints
/// POST   /{video_id}/checkpoints            -> create_checkpoint
/// DELETE /{video_id}/checkpoints/{id}       -> delete_checkpoint
/// GET    /{video_id}/clips                  -> list_video_clips
/// ```
pub fn video_router() -> Router<AppState> {
    Router::new()
        .route("/", get(videos::list_videos).post(videos::create_video))
        .route("/{id}", get(videos::get_video))
        .route(
            "/{video_id}/checkpoints",
            get(videos::list_checkpoints).post(videos::create_checkpoint),
        )
        .route(
            "/{video_id}/checkpoints/{id}",
            delete(videos::delete_checkpoint),
        )
        .route("/{video_id}/clips", get(clips::list_video_clips))
}

/// Remedial clip catalog routes mounted at `/clips`.
///
/// ```text
/// GET  /   -> list_clips
/// POST /   -> create_clip
/// ```
pub fn clip_router() -> Router<AppState> {
    Router::new().route("/", get(clips::list_clips).post(clips::create_clip))
}
