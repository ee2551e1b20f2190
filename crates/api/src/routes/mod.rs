pub mod health;
pub mod playback;
pub mod videos;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /sessions                                 start or resume (POST)
/// /sessions/{id}                            session snapshot (GET)
/// /sessions/{id}/advance                    report playhead progress (POST)
/// /sessions/{id}/answer                     answer pending checkpoint (POST)
/// /sessions/{id}/complete-clip              finish remedial clip (POST)
/// /sessions/{id}/resume-info                where to restart playback (GET)
/// /sessions/{id}/events                     full progress ledger (GET)
///
/// /videos                                   list, register (GET, POST)
/// /videos/{id}                              video detail (GET)
/// /videos/{video_id}/checkpoints            list, author (GET, POST)
/// /videos/{video_id}/checkpoints/{id}       remove (DELETE)
/// /videos/{video_id}/clips                  clips reachable from video (GET)
///
/// /clips                                    list, register (GET, POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Playback session lifecycle.
        .nest("/sessions", playback::router())
        // Video catalog and checkpoint authoring.
        .nest("/videos", videos::video_router())
        // Remedial clip catalog.
        .nest("/clips", videos::clip_router())
}
