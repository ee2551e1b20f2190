//! Handlers for the remedial clip catalog.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use guidepost_core::error::CoreError;
use guidepost_core::types::DbId;
use guidepost_db::models::remedial_clip::CreateClip;
use guidepost_db::repositories::{ClipRepo, VideoRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClipRequest {
    #[validate(length(min = 1, max = 512))]
    pub title: String,
    #[validate(range(min = 0.001))]
    pub duration_secs: f64,
    #[validate(length(min = 1))]
    pub media_ref: String,
}

/// GET /api/v1/clips
///
/// List all remedial clips, newest first.
pub async fn list_clips(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let clips = ClipRepo::list(&state.pool).await?;

    Ok(Json(DataResponse { data: clips }))
}

/// POST /api/v1/clips
///
/// Register a remedial clip so checkpoints can branch to it.
pub async fn create_clip(
    State(state): State<AppState>,
    Json(input): Json<CreateClipRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let clip = ClipRepo::create(
        &state.pool,
        &CreateClip {
            title: input.title,
            duration_secs: input.duration_secs,
            media_ref: input.media_ref,
        },
    )
    .await?;

    tracing::info!(clip_id = clip.id, "Remedial clip registered");

    Ok((StatusCode::CREATED, Json(DataResponse { data: clip })))
}

/// GET /api/v1/videos/{video_id}/clips
///
/// Clips reachable from a video's checkpoints.
pub async fn list_video_clips(
    State(state): State<AppState>,
    Path(video_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    VideoRepo::find_by_id(&state.pool, video_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PrimaryVideo",
            id: video_id,
        }))?;

    let clips = ClipRepo::list_for_video(&state.pool, video_id).await?;

    Ok(Json(DataResponse { data: clips }))
}
