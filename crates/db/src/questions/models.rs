use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A question bound to one chat session. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: Uuid,
    pub topic: String,
    pub body: String,
    pub asked_by: String,
    pub assigned_to: Option<String>,
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// True when `identity` is the asker or the assignee.
    pub fn involves(&self, identity: &str) -> bool {
        self.asked_by == identity || self.assigned_to.as_deref() == Some(identity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuestionFilter {
    /// Restrict to questions asked by or assigned to this identity.
    pub participant: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
