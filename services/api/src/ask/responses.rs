use chrono::{DateTime, Utc};
use expertline_db::questions::models::Question;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub topic: String,
    pub body: String,
    pub asked_by: String,
    pub assigned_to: Option<String>,
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Question> for QuestionResponse {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            topic: q.topic,
            body: q.body,
            asked_by: q.asked_by,
            assigned_to: q.assigned_to,
            session_id: q.session_id,
            created_at: q.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub question: QuestionResponse,
    pub session_id: Uuid,
    pub assigned_to: Option<String>,
}
