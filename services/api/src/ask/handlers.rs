use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use expertline_matching::AssignRequest;
use expertline_moderation::Subject;

use crate::error::ApiError;
use crate::extractors::ClientAddr;
use crate::AppState;

use super::requests::AskRequest;
use super::responses::AskResponse;

pub async fn post_question(
    State(state): State<AppState>,
    addr: ClientAddr,
    Json(body): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .guard
        .enforce(Subject::new(Some(&body.asked_by), addr.as_deref()))
        .await?;

    let assignment = state
        .engine
        .assign(AssignRequest {
            topic: body.topic,
            body: body.question,
            asked_by: body.asked_by,
        })
        .await?;

    let question = assignment.question;
    let resp = AskResponse {
        session_id: question.session_id,
        assigned_to: question.assigned_to.clone(),
        question: question.into(),
    };
    Ok((StatusCode::CREATED, Json(resp)))
}
