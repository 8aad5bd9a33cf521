use chrono::{DateTime, Utc};
use expertline_db::bans::models::Ban;
use expertline_db::chat::models::ChatMessage;
use expertline_db::moderation::models::ModerationRecord;
use serde::Serialize;
use uuid::Uuid;

use crate::users::responses::UserResponse;

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub data: Vec<UserResponse>,
    pub count: usize,
}

/// Admins see both the original and the stored text.
#[derive(Debug, Serialize)]
pub struct AdminMessage {
    pub id: Uuid,
    pub seq: i64,
    pub from: String,
    pub original_text: String,
    pub stored_text: String,
    pub redacted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for AdminMessage {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id,
            seq: m.seq,
            from: m.sender,
            original_text: m.original_text,
            stored_text: m.stored_text,
            redacted: m.redacted,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatGroup {
    pub session_id: Uuid,
    pub messages: Vec<AdminMessage>,
}

#[derive(Debug, Serialize)]
pub struct ListChatsResponse {
    pub data: Vec<ChatGroup>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ListModerationResponse {
    pub data: Vec<ModerationRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ListBansResponse {
    pub data: Vec<Ban>,
    pub count: usize,
}
