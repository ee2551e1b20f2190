//! Handlers for the video catalog and checkpoint authoring.
//!
//! Checkpoint creation validates the prospective checkpoint set as a whole
//! (offsets in range, unique, clip references resolvable) by building the
//! same registry the state machine runs against. Content that would break a
//! playback session is rejected at authoring time.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use guidepost_core::error::CoreError;
use guidepost_core::registry::{Checkpoint, CheckpointKind, CheckpointRegistry};
use guidepost_core::timecode::parse_timecode;
use guidepost_core::types::DbId;
use guidepost_db::models::checkpoint::CreateCheckpoint;
use guidepost_db::models::video::CreateVideo;
use guidepost_db::repositories::{CheckpointRepo, ClipRepo, ProgressEventRepo, VideoRepo};
use serde::Deserialize;
use validator::Validate;

use crate::engine::PlaybackEngine;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Videos
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVideoRequest {
    #[validate(length(min = 1, max = 512))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 0.001))]
    pub duration_secs: f64,
    #[validate(length(min = 1))]
    pub media_ref: String,
}

/// GET /api/v1/videos
///
/// List the video catalog, newest first.
pub async fn list_videos(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let videos = VideoRepo::list(&state.pool).await?;

    Ok(Json(DataResponse { data: videos }))
}

/// POST /api/v1/videos
///
/// Register a primary video in the catalog.
pub async fn create_video(
    State(state): State<AppState>,
    Json(input): Json<CreateVideoRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let video = VideoRepo::create(
        &state.pool,
        &CreateVideo {
            title: input.title,
            description: input.description,
            duration_secs: input.duration_secs,
            media_ref: input.media_ref,
        },
    )
    .await?;

    tracing::info!(video_id = video.id, "Video registered");

    Ok((StatusCode::CREATED, Json(DataResponse { data: video })))
}

/// GET /api/v1/videos/{id}
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let video = VideoRepo::find_by_id(&state.pool, video_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PrimaryVideo",
            id: video_id,
        }))?;

    Ok(Json(DataResponse { data: video }))
}

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateCheckpointRequest {
    /// Offset into the primary video, in seconds.
    pub offset_secs: Option<f64>,
    /// Alternative to `offset_secs`: an `HH:MM:SS` timecode.
    pub timecode: Option<String>,
    pub kind: CheckpointKind,
    pub required: bool,
    pub prompt: String,
    pub remedial_clip_id: Option<DbId>,
    pub pass_answer: Option<String>,
}

impl CreateCheckpointRequest {
    /// Resolve the offset from whichever of the two forms was supplied.
    fn offset(&self) -> Result<f64, AppError> {
        match (self.offset_secs, &self.timecode) {
            (Some(secs), None) => Ok(secs),
            (None, Some(tc)) => Ok(f64::from(parse_timecode(tc)?)),
            (Some(_), Some(_)) => Err(AppError::BadRequest(
                "Provide offset_secs or timecode, not both".into(),
            )),
            (None, None) => Err(AppError::BadRequest(
                "One of offset_secs or timecode is required".into(),
            )),
        }
    }
}

/// GET /api/v1/videos/{video_id}/checkpoints
///
/// All checkpoints of a video, ordered by offset.
pub async fn list_checkpoints(
    State(state): State<AppState>,
    Path(video_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    VideoRepo::find_by_id(&state.pool, video_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PrimaryVideo",
            id: video_id,
        }))?;

    let checkpoints = CheckpointRepo::list_by_video(&state.pool, video_id).await?;

    Ok(Json(DataResponse { data: checkpoints }))
}

/// POST /api/v1/videos/{video_id}/checkpoints
///
/// Author a checkpoint. The offset may be given in seconds or as an
/// `HH:MM:SS` timecode. The whole prospective checkpoint set is validated
/// before the insert.
pub async fn create_checkpoint(
    State(state): State<AppState>,
    Path(video_id): Path<DbId>,
    Json(input): Json<CreateCheckpointRequest>,
) -> AppResult<impl IntoResponse> {
    if input.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("prompt must not be empty".into()));
    }

    let offset_secs = input.offset()?;

    let (video, _) = PlaybackEngine::load_registry(&state, video_id).await?;

    // Re-validate the registry as it would look with this checkpoint in it.
    let mut checkpoints: Vec<Checkpoint> = CheckpointRepo::list_by_video(&state.pool, video_id)
        .await?
        .iter()
        .map(|c| c.to_domain())
        .collect::<Result<_, _>>()?;
    checkpoints.push(Checkpoint {
        id: 0, // placeholder, assigned on insert
        video_id,
        offset_secs,
        kind: input.kind,
        required: input.required,
        remedial_clip_id: input.remedial_clip_id,
        pass_answer: input.pass_answer.clone(),
    });

    let mut clips: Vec<_> = ClipRepo::list_for_video(&state.pool, video_id)
        .await?
        .iter()
        .map(|c| c.to_domain())
        .collect();
    if let Some(clip_id) = input.remedial_clip_id {
        if !clips.iter().any(|c| c.id == clip_id) {
            let clip = ClipRepo::find_by_id(&state.pool, clip_id)
                .await?
                .ok_or(AppError::Core(CoreError::UnknownClip(clip_id)))?;
            clips.push(clip.to_domain());
        }
    }

    CheckpointRegistry::new(video.to_domain(), checkpoints, clips)?;

    let checkpoint = CheckpointRepo::create(
        &state.pool,
        &CreateCheckpoint {
            video_id,
            offset_secs,
            kind: input.kind,
            required: input.required,
            prompt: input.prompt,
            remedial_clip_id: input.remedial_clip_id,
            pass_answer: input.pass_answer,
        },
    )
    .await?;

    tracing::info!(
        checkpoint_id = checkpoint.id,
        video_id,
        offset_secs,
        "Checkpoint authored"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: checkpoint })))
}

/// Deleting a checkpoint that recorded progress events reference would make
/// replay fail for every in-flight session of the video; content is
/// immutable once a session has interacted with it.
fn ensure_unreferenced(checkpoint_id: DbId, referenced: bool) -> Result<(), AppError> {
    if referenced {
        return Err(AppError::Conflict(format!(
            "Checkpoint {checkpoint_id} is referenced by recorded session progress"
        )));
    }
    Ok(())
}

/// DELETE /api/v1/videos/{video_id}/checkpoints/{id}
///
/// Refused while any session's ledger references the checkpoint.
pub async fn delete_checkpoint(
    State(state): State<AppState>,
    Path((video_id, checkpoint_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let checkpoint = CheckpointRepo::find_by_id(&state.pool, checkpoint_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Checkpoint",
            id: checkpoint_id,
        }))?;

    if checkpoint.video_id != video_id {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Checkpoint",
            id: checkpoint_id,
        }));
    }

    let referenced =
        ProgressEventRepo::checkpoint_referenced(&state.pool, video_id, checkpoint_id).await?;
    ensure_unreferenced(checkpoint_id, referenced)?;

    CheckpointRepo::delete(&state.pool, checkpoint_id).await?;

    tracing::info!(checkpoint_id, video_id, "Checkpoint removed");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request(offset_secs: Option<f64>, timecode: Option<&str>) -> CreateCheckpointRequest {
        CreateCheckpointRequest {
            offset_secs,
            timecode: timecode.map(str::to_string),
            kind: CheckpointKind::Question,
            required: true,
            prompt: "What does the red light mean?".into(),
            remedial_clip_id: None,
            pass_answer: Some("stop".into()),
        }
    }

    #[test]
    fn offset_from_seconds() {
        assert_eq!(request(Some(42.5), None).offset().unwrap(), 42.5);
    }

    #[test]
    fn offset_from_timecode() {
        assert_eq!(request(None, Some("00:01:30")).offset().unwrap(), 90.0);
    }

    #[test]
    fn offset_rejects_both_forms() {
        let err = request(Some(1.0), Some("00:00:01")).offset().unwrap_err();
        assert_matches!(err, AppError::BadRequest(_));
    }

    #[test]
    fn offset_rejects_neither_form() {
        let err = request(None, None).offset().unwrap_err();
        assert_matches!(err, AppError::BadRequest(_));
    }

    #[test]
    fn offset_rejects_malformed_timecode() {
        let err = request(None, Some("90 seconds")).offset().unwrap_err();
        assert_matches!(err, AppError::Core(_));
    }

    #[test]
    fn delete_refused_while_ledger_references_checkpoint() {
        let err = ensure_unreferenced(7, true).unwrap_err();
        assert_matches!(err, AppError::Conflict(_));
    }

    #[test]
    fn delete_allowed_for_unreferenced_checkpoint() {
        assert!(ensure_unreferenced(7, false).is_ok());
    }
}
