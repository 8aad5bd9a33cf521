use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use expertline_common::error::ExpertError;
use expertline_db::questions::models::QuestionFilter;
use expertline_db::users::models::NewUser;

use crate::error::ApiError;
use crate::AppState;

use super::requests::{QuestionsQuery, SignupRequest};
use super::responses::{ListQuestionsResponse, UserResponse};

pub(crate) fn validate_email(email: &str) -> Result<(), ExpertError> {
    if !email.contains('@') {
        return Err(ExpertError::Validation(format!(
            "invalid email format: {email}"
        )));
    }
    Ok(())
}

pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError(ExpertError::Validation(
            "name must not be empty".to_string(),
        )));
    }
    validate_email(body.email.trim())?;

    let user = state
        .users
        .create(NewUser {
            name: body.name,
            email: body.email,
            expertise: body.expertise,
            is_admin: false,
        })
        .await?;
    tracing::info!(email = %user.email, expertise = user.expertise.len(), "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Questions the caller asked or was assigned. Admins see every question.
pub async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionsQuery>,
) -> Result<Json<ListQuestionsResponse>, ApiError> {
    let user = state
        .users
        .get_by_email(&query.email)
        .await?
        .ok_or_else(|| ApiError(ExpertError::NotFound(format!("user not found: {}", query.email))))?;

    let filter = QuestionFilter {
        participant: (!user.is_admin).then(|| user.email.clone()),
        limit: query.limit,
        offset: query.offset,
    };
    let data: Vec<_> = state
        .questions
        .list(filter)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let count = data.len();
    Ok(Json(ListQuestionsResponse { data, count }))
}
