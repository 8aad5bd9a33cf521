use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::models::User;

/// Which side of the conversation sent the offending message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Asker,
    Expert,
    Unknown,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asker => "asker",
            Self::Expert => "expert",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for SenderRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asker" => Ok(Self::Asker),
            "expert" => Ok(Self::Expert),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("unknown sender role: {value}")),
        }
    }
}

/// Participant identity as it was when the violation happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantSnapshot {
    pub identity: String,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ParticipantSnapshot {
    /// Snapshot for an identity with no registered user record.
    pub fn unregistered(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            name: None,
            created_at: None,
        }
    }
}

impl From<&User> for ParticipantSnapshot {
    fn from(user: &User) -> Self {
        Self {
            identity: user.email.clone(),
            name: Some(user.name.clone()),
            created_at: Some(user.created_at),
        }
    }
}

/// Write-once audit entry for a redacted message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModerationRecord {
    pub id: Uuid,
    pub message_id: Uuid,
    pub session_id: Uuid,
    pub sender: String,
    pub sender_role: SenderRole,
    pub original_text: String,
    pub redacted_text: String,
    pub offending_token: String,
    pub asker: Option<ParticipantSnapshot>,
    pub expert: Option<ParticipantSnapshot>,
    pub question_topic: Option<String>,
    pub question_body: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewModerationRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sender: String,
    pub sender_role: SenderRole,
    pub original_text: String,
    pub redacted_text: String,
    pub offending_token: String,
    pub asker: Option<ParticipantSnapshot>,
    pub expert: Option<ParticipantSnapshot>,
    pub question_topic: Option<String>,
    pub question_body: Option<String>,
}

impl NewModerationRecord {
    pub fn into_record(self, message_id: Uuid, created_at: DateTime<Utc>) -> ModerationRecord {
        ModerationRecord {
            id: self.id,
            message_id,
            session_id: self.session_id,
            sender: self.sender,
            sender_role: self.sender_role,
            original_text: self.original_text,
            redacted_text: self.redacted_text,
            offending_token: self.offending_token,
            asker: self.asker,
            expert: self.expert,
            question_topic: self.question_topic,
            question_body: self.question_body,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModerationFilter {
    pub session_id: Option<Uuid>,
    pub message_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
