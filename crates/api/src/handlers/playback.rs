//! Handlers for playback session operations.
//!
//! Mutating operations (`advance`, `answer`, `complete_clip`) carry the
//! client's `expected_seq`: the sequence number it believes the next ledger
//! event will have. A mismatch means the client is stale and the operation
//! is rejected before anything runs, which also makes honest retries after
//! a timeout idempotent.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use guidepost_core::error::CoreError;
use guidepost_core::ledger::ProgressEvent;
use guidepost_core::session::{ClipOutcome, Instruction, PlaybackSession};
use guidepost_core::types::{DbId, LearnerId};
use guidepost_db::models::playback_session::PlaybackSessionRow;
use guidepost_db::repositories::{ProgressEventRepo, SessionRepo, VideoRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::PlaybackEngine;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    pub learner_id: LearnerId,
    pub video_id: DbId,
    /// Opt-in address for the completion email.
    #[validate(email)]
    pub notify_email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdvanceRequest {
    pub expected_seq: i64,
    #[validate(range(min = 0.0))]
    pub offset_secs: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    pub expected_seq: i64,
    #[validate(length(min = 1, max = 4096))]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteClipRequest {
    pub expected_seq: i64,
    /// `"pass"` or `"fail"`.
    pub outcome: String,
}

/// Response body for the start-or-resume endpoint.
#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session: PlaybackSessionRow,
    /// False when an existing non-completed session was returned instead.
    pub created: bool,
}

/// Response body for every mutating session operation.
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub session: PlaybackSession,
    pub instruction: Instruction,
    /// Ledger events this operation appended, in order.
    pub appended_events: Vec<ProgressEvent>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/sessions
///
/// Start a session for a (learner, video) pair, or hand back the existing
/// non-completed one. Starting a fresh session counts a view on the video.
pub async fn start_or_resume(
    State(state): State<AppState>,
    Json(input): Json<StartSessionRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if let Some(existing) =
        SessionRepo::find_active_for_pair(&state.pool, input.learner_id, input.video_id).await?
    {
        tracing::debug!(session_id = existing.id, "Returning existing session");
        return Ok(Json(DataResponse {
            data: StartSessionResponse {
                session: existing,
                created: false,
            },
        }));
    }

    // Reject unknown videos before creating anything.
    VideoRepo::find_by_id(&state.pool, input.video_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PrimaryVideo",
            id: input.video_id,
        }))?;

    let session = SessionRepo::create(
        &state.pool,
        input.learner_id,
        input.video_id,
        input.notify_email.as_deref(),
    )
    .await?;
    VideoRepo::increment_views(&state.pool, input.video_id).await?;

    tracing::info!(
        session_id = session.id,
        video_id = input.video_id,
        "Session started"
    );

    Ok(Json(DataResponse {
        data: StartSessionResponse {
            session,
            created: true,
        },
    }))
}

/// GET /api/v1/sessions/{id}
///
/// The current session snapshot.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = SessionRepo::find_by_id(&state.pool, session_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PlaybackSession",
            id: session_id,
        }))?;

    Ok(Json(DataResponse { data: session }))
}

/// POST /api/v1/sessions/{id}/advance
///
/// Report playhead progress. Records every checkpoint crossed, parks at the
/// first blocking one, completes the session at the end of the video.
pub async fn advance(
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<AdvanceRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome =
        PlaybackEngine::advance(&state, session_id, input.expected_seq, input.offset_secs).await?;

    Ok(Json(DataResponse {
        data: OperationResponse {
            session: outcome.session,
            instruction: outcome.instruction,
            appended_events: outcome.appended,
        },
    }))
}

/// POST /api/v1/sessions/{id}/answer
///
/// Answer the pending checkpoint. A failing answer branches into the
/// configured remedial clip, or asks for a retry when none exists.
pub async fn answer(
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<AnswerRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome =
        PlaybackEngine::answer(&state, session_id, input.expected_seq, &input.value).await?;

    Ok(Json(DataResponse {
        data: OperationResponse {
            session: outcome.session,
            instruction: outcome.instruction,
            appended_events: outcome.appended,
        },
    }))
}

/// POST /api/v1/sessions/{id}/complete-clip
///
/// Finish the active remedial clip with the reported outcome.
pub async fn complete_clip(
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<CompleteClipRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = ClipOutcome::parse(&input.outcome)?;

    let result =
        PlaybackEngine::complete_clip(&state, session_id, input.expected_seq, outcome).await?;

    Ok(Json(DataResponse {
        data: OperationResponse {
            session: result.session,
            instruction: result.instruction,
            appended_events: result.appended,
        },
    }))
}

/// GET /api/v1/sessions/{id}/resume-info
///
/// Where a re-attaching client should restart playback. Served from a full
/// ledger replay, not the snapshot.
pub async fn resume_info(
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let info = PlaybackEngine::resume_info(&state, session_id).await?;

    Ok(Json(DataResponse { data: info }))
}

/// GET /api/v1/sessions/{id}/events
///
/// The full progress ledger for a session, in sequence order.
pub async fn list_events(
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    SessionRepo::find_by_id(&state.pool, session_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PlaybackSession",
            id: session_id,
        }))?;

    let events = ProgressEventRepo::list_for_session(&state.pool, session_id).await?;

    Ok(Json(DataResponse { data: events }))
}
