use axum::extract::{Path, State};
use axum::Json;
use expertline_moderation::Subject;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::ClientAddr;
use crate::AppState;

use super::requests::PostMessageRequest;
use super::responses::{EndSessionResponse, PostMessageResponse, TranscriptResponse};

pub async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let transcript = state.sessions.transcript(session_id).await?;
    Ok(Json(TranscriptResponse {
        messages: transcript.messages.into_iter().map(Into::into).collect(),
        ended: transcript.ended,
    }))
}

pub async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    addr: ClientAddr,
    Json(body): Json<PostMessageRequest>,
) -> Result<Json<PostMessageResponse>, ApiError> {
    state
        .guard
        .enforce(Subject::new(Some(&body.from), addr.as_deref()))
        .await?;

    let message = state
        .pipeline
        .submit(session_id, &body.from, &body.text)
        .await?;
    Ok(Json(PostMessageResponse {
        message: message.into(),
    }))
}

pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    addr: ClientAddr,
) -> Result<Json<EndSessionResponse>, ApiError> {
    state
        .guard
        .enforce(Subject::new(None, addr.as_deref()))
        .await?;

    let session = state.sessions.end(session_id).await?;
    Ok(Json(EndSessionResponse {
        success: true,
        ended: session.ended,
    }))
}
