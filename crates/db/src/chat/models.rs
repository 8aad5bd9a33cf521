use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Open,
    Ended,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Ended => "ended",
        }
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "ended" => Ok(Self::Ended),
            _ => Err(format!("unknown session state: {value}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    pub session_id: Uuid,
    pub ended: bool,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    pub fn state(&self) -> SessionState {
        if self.ended {
            SessionState::Ended
        } else {
            SessionState::Open
        }
    }
}

/// A persisted chat message. `seq` is assigned by the store and orders
/// messages within a session by arrival.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub seq: i64,
    pub session_id: Uuid,
    pub sender: String,
    pub original_text: String,
    pub stored_text: String,
    pub redacted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sender: String,
    pub original_text: String,
    pub stored_text: String,
}

impl NewMessage {
    pub fn redacted(&self) -> bool {
        self.original_text != self.stored_text
    }
}

#[derive(Debug, Clone)]
pub enum AppendOutcome {
    Accepted(ChatMessage),
    SessionClosed,
}

#[derive(Debug, Clone)]
pub struct EndOutcome {
    pub session: ChatSession,
    /// False when the session was already ended.
    pub transitioned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_round_trips_through_str() {
        for state in [SessionState::Open, SessionState::Ended] {
            assert_eq!(SessionState::from_str(state.as_str()), Ok(state));
        }
        assert!(SessionState::from_str("closed").is_err());
    }

    #[test]
    fn ended_flag_drives_state() {
        let mut session = ChatSession {
            session_id: Uuid::new_v4(),
            ended: false,
            created_at: Utc::now(),
            ended_at: None,
        };
        assert_eq!(session.state(), SessionState::Open);
        session.ended = true;
        assert_eq!(session.state(), SessionState::Ended);
    }
}
