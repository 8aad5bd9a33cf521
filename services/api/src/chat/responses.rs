use chrono::{DateTime, Utc};
use expertline_db::chat::models::ChatMessage;
use serde::Serialize;
use uuid::Uuid;

/// A message as participants see it: only the stored (redacted) text.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub seq: i64,
    pub from: String,
    pub text: String,
    pub redacted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for MessageResponse {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id,
            seq: m.seq,
            from: m.sender,
            text: m.stored_text,
            redacted: m.redacted,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub messages: Vec<MessageResponse>,
    pub ended: bool,
}

#[derive(Debug, Serialize)]
pub struct PostMessageResponse {
    pub message: MessageResponse,
}

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub success: bool,
    pub ended: bool,
}
