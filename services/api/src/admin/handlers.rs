use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use expertline_common::error::ExpertError;
use expertline_db::bans::models::BanKind;
use expertline_db::chat::models::ChatMessage;
use expertline_db::moderation::models::ModerationFilter;
use expertline_db::users::models::UserUpdate;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::AdminCaller;
use crate::users::handlers::validate_email;
use crate::users::responses::UserResponse;
use crate::AppState;

use super::requests::{
    BanAddressRequest, BanIdentityRequest, ChatsQuery, ModerationQuery, UpdateUserRequest,
};
use super::responses::{
    ChatGroup, ListBansResponse, ListChatsResponse, ListModerationResponse, ListUsersResponse,
};

const DEFAULT_CHAT_LIMIT: i64 = 500;
const DEFAULT_MODERATION_LIMIT: i64 = 50;

/// Group newest-first messages by session, sessions ordered by their latest
/// message, messages inside a group in arrival order.
fn group_by_session(newest_first: Vec<ChatMessage>) -> Vec<ChatGroup> {
    let mut groups: Vec<ChatGroup> = Vec::new();
    for message in newest_first {
        let session_id = message.session_id;
        match groups.iter_mut().find(|g| g.session_id == session_id) {
            Some(group) => group.messages.push(message.into()),
            None => groups.push(ChatGroup {
                session_id,
                messages: vec![message.into()],
            }),
        }
    }
    for group in &mut groups {
        group.messages.reverse();
    }
    groups
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> Result<Json<ListUsersResponse>, ApiError> {
    let data: Vec<UserResponse> = state
        .users
        .list()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let count = data.len();
    Ok(Json(ListUsersResponse { data, count }))
}

pub async fn update_user(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if let Some(ref name) = body.name {
        if name.trim().is_empty() {
            return Err(ApiError(ExpertError::Validation(
                "name must not be empty".to_string(),
            )));
        }
    }
    if let Some(ref email) = body.email {
        validate_email(email.trim())?;
    }

    let user = state
        .users
        .update(
            id,
            UserUpdate {
                name: body.name,
                email: body.email,
                expertise: body.expertise,
                is_admin: body.is_admin,
            },
        )
        .await?;
    tracing::info!(admin = %admin.email, user_id = %id, "user updated");
    Ok(Json(user.into()))
}

pub async fn list_chats(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<ChatsQuery>,
) -> Result<Json<ListChatsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_CHAT_LIMIT).clamp(1, 5000);
    let messages = state.chat.list_recent(limit).await?;
    let data = group_by_session(messages);
    let count = data.len();
    Ok(Json(ListChatsResponse { data, count }))
}

pub async fn list_moderation(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<ModerationQuery>,
) -> Result<Json<ListModerationResponse>, ApiError> {
    let filter = ModerationFilter {
        session_id: query.session_id,
        message_id: None,
        limit: Some(query.limit.unwrap_or(DEFAULT_MODERATION_LIMIT).clamp(1, 500)),
        offset: query.offset,
    };
    let data = state.moderation.list(filter).await?;
    let count = data.len();
    Ok(Json(ListModerationResponse { data, count }))
}

pub async fn list_bans(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> Result<Json<ListBansResponse>, ApiError> {
    let data = state.bans.list().await?;
    let count = data.len();
    Ok(Json(ListBansResponse { data, count }))
}

pub async fn ban_identity(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Json(body): Json<BanIdentityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    add_ban(&state, &admin.email, BanKind::Identity, &body.identity, body.reason).await
}

pub async fn ban_address(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Json(body): Json<BanAddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    add_ban(&state, &admin.email, BanKind::Address, &body.address, body.reason).await
}

async fn add_ban(
    state: &AppState,
    admin: &str,
    kind: BanKind,
    value: &str,
    reason: Option<String>,
) -> Result<impl IntoResponse, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError(ExpertError::Validation(format!(
            "{} must not be empty",
            kind.as_str()
        ))));
    }
    let ban = state.bans.add(kind, value, reason).await?;
    tracing::info!(%admin, kind = kind.as_str(), value = %ban.value, "ban recorded");
    Ok((StatusCode::CREATED, Json(ban)))
}
