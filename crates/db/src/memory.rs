//! In-process store implementing every repository trait.
//!
//! Mirrors the Postgres semantics the services depend on: registration
//! order for the expert directory, store-assigned message sequence numbers,
//! the conditional `ended` transition and atomic message + audit writes.
//! Enabled with the `memory` feature and used by tests across the workspace.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::bans::models::{Ban, BanKind};
use crate::bans::repositories::BanRepository;
use crate::chat::models::{AppendOutcome, ChatMessage, ChatSession, EndOutcome, NewMessage};
use crate::chat::repositories::ChatRepository;
use crate::moderation::models::{ModerationFilter, ModerationRecord, NewModerationRecord};
use crate::moderation::repositories::ModerationRepository;
use crate::questions::models::{Question, QuestionFilter};
use crate::questions::repositories::QuestionRepository;
use crate::users::models::{normalize_identity, NewUser, User, UserUpdate};
use crate::users::repositories::{ExpertDirectory, UserRepository};
use expertline_common::error::{ExpertError, ExpertResult};

#[derive(Default)]
struct State {
    users: Vec<User>,
    questions: Vec<Question>,
    sessions: HashMap<Uuid, ChatSession>,
    messages: Vec<ChatMessage>,
    records: Vec<ModerationRecord>,
    bans: Vec<Ban>,
    next_seq: i64,
    append_failures: usize,
}

impl State {
    fn session_entry(&mut self, session_id: Uuid) -> &mut ChatSession {
        self.sessions
            .entry(session_id)
            .or_insert_with(|| ChatSession {
                session_id,
                ended: false,
                created_at: Utc::now(),
                ended_at: None,
            })
    }

    fn is_banned(&self, kind: BanKind, value: &str) -> bool {
        let value = kind.normalize(value);
        self.bans.iter().any(|b| b.kind == kind && b.value == value)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `append_message` fail with `Conflict`
    /// before touching any data.
    pub async fn fail_next_appends(&self, count: usize) {
        self.state.lock().await.append_failures = count;
    }

    /// Every audit record, oldest first.
    pub async fn moderation_records(&self) -> Vec<ModerationRecord> {
        self.state.lock().await.records.clone()
    }

    /// Every message across sessions, in store order.
    pub async fn all_messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> ExpertResult<User> {
        let user = user.normalized();
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(ExpertError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            expertise: user.expertise,
            is_admin: user.is_admin,
            created_at: Utc::now(),
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: Uuid) -> ExpertResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> ExpertResult<Option<User>> {
        let email = normalize_identity(email);
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> ExpertResult<Vec<User>> {
        Ok(self.state.lock().await.users.clone())
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> ExpertResult<User> {
        let update = update.normalized();
        let mut state = self.state.lock().await;
        if let Some(email) = &update.email {
            if state.users.iter().any(|u| &u.email == email && u.id != id) {
                return Err(ExpertError::Conflict(format!(
                    "email already registered: {email}"
                )));
            }
        }
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| ExpertError::NotFound(format!("user not found: {id}")))?;
        update.apply(user);
        Ok(user.clone())
    }
}

#[async_trait]
impl ExpertDirectory for MemoryStore {
    async fn find_expert(&self, candidates: &[String]) -> ExpertResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .filter(|u| !state.is_banned(BanKind::Identity, &u.email))
            .find(|u| u.expertise.iter().any(|e| candidates.contains(e)))
            .cloned())
    }
}

#[async_trait]
impl QuestionRepository for MemoryStore {
    async fn create_with_session(&self, question: Question) -> ExpertResult<Question> {
        let mut state = self.state.lock().await;
        if state
            .questions
            .iter()
            .any(|q| q.session_id == question.session_id)
        {
            return Err(ExpertError::Conflict(format!(
                "session id already bound: {}",
                question.session_id
            )));
        }
        state.session_entry(question.session_id);
        state.questions.push(question.clone());
        Ok(question)
    }

    async fn get_by_session(&self, session_id: Uuid) -> ExpertResult<Option<Question>> {
        let state = self.state.lock().await;
        Ok(state
            .questions
            .iter()
            .find(|q| q.session_id == session_id)
            .cloned())
    }

    async fn list(&self, filter: QuestionFilter) -> ExpertResult<Vec<Question>> {
        let state = self.state.lock().await;
        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.unwrap_or(100).max(0) as usize;
        Ok(state
            .questions
            .iter()
            .filter(|q| match &filter.participant {
                Some(p) => q.involves(p),
                None => true,
            })
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn ensure_session(&self, session_id: Uuid) -> ExpertResult<ChatSession> {
        let mut state = self.state.lock().await;
        Ok(state.session_entry(session_id).clone())
    }

    async fn get_session(&self, session_id: Uuid) -> ExpertResult<Option<ChatSession>> {
        let state = self.state.lock().await;
        Ok(state.sessions.get(&session_id).cloned())
    }

    async fn end_session(&self, session_id: Uuid) -> ExpertResult<EndOutcome> {
        let mut state = self.state.lock().await;
        let session = state.session_entry(session_id);
        let transitioned = !session.ended;
        if transitioned {
            session.ended = true;
            session.ended_at = Some(Utc::now());
        }
        Ok(EndOutcome {
            session: session.clone(),
            transitioned,
        })
    }

    async fn append_message(
        &self,
        message: NewMessage,
        audit: Option<NewModerationRecord>,
    ) -> ExpertResult<AppendOutcome> {
        let mut state = self.state.lock().await;

        if state.append_failures > 0 {
            state.append_failures -= 1;
            return Err(ExpertError::Conflict("injected append failure".to_string()));
        }

        if state.session_entry(message.session_id).ended {
            return Ok(AppendOutcome::SessionClosed);
        }

        let now = Utc::now();
        if let Some(record) = audit {
            if state.records.iter().any(|r| r.message_id == message.id) {
                return Err(ExpertError::Conflict(format!(
                    "audit record exists for message {}",
                    message.id
                )));
            }
            state.records.push(record.into_record(message.id, now));
        }

        state.next_seq += 1;
        let stored = ChatMessage {
            id: message.id,
            seq: state.next_seq,
            session_id: message.session_id,
            redacted: message.redacted(),
            sender: message.sender,
            original_text: message.original_text,
            stored_text: message.stored_text,
            created_at: now,
        };
        state.messages.push(stored.clone());
        Ok(AppendOutcome::Accepted(stored))
    }

    async fn list_messages(&self, session_id: Uuid) -> ExpertResult<Vec<ChatMessage>> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: i64) -> ExpertResult<Vec<ChatMessage>> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ModerationRepository for MemoryStore {
    async fn list(&self, filter: ModerationFilter) -> ExpertResult<Vec<ModerationRecord>> {
        let state = self.state.lock().await;
        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.unwrap_or(50).max(0) as usize;
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| filter.session_id.map_or(true, |s| r.session_id == s))
            .filter(|r| filter.message_id.map_or(true, |m| r.message_id == m))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BanRepository for MemoryStore {
    async fn is_banned(&self, kind: BanKind, value: &str) -> ExpertResult<bool> {
        Ok(self.state.lock().await.is_banned(kind, value))
    }

    async fn add(&self, kind: BanKind, value: &str, reason: Option<String>) -> ExpertResult<Ban> {
        let value = kind.normalize(value);
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .bans
            .iter()
            .find(|b| b.kind == kind && b.value == value)
        {
            return Ok(existing.clone());
        }
        let ban = Ban {
            id: Uuid::new_v4(),
            kind,
            value,
            reason,
            created_at: Utc::now(),
        };
        state.bans.push(ban.clone());
        Ok(ban)
    }

    async fn list(&self) -> ExpertResult<Vec<Ban>> {
        let state = self.state.lock().await;
        Ok(state.bans.iter().rev().cloned().collect())
    }
}
