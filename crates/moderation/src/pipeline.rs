use std::sync::Arc;

use expertline_common::error::{ExpertError, ExpertResult, ForbiddenReason};
use expertline_db::chat::models::{AppendOutcome, ChatMessage, NewMessage};
use expertline_db::chat::repositories::ChatRepository;
use expertline_db::moderation::models::{NewModerationRecord, ParticipantSnapshot, SenderRole};
use expertline_db::questions::models::Question;
use expertline_db::questions::repositories::QuestionRepository;
use expertline_db::users::models::normalize_identity;
use expertline_db::users::repositories::UserRepository;
use uuid::Uuid;

use crate::alerts::AlertQueue;
use crate::filter::ProfanityFilter;
use crate::sessions::{with_one_retry, ChatSessions};

/// Inspects, redacts and stores every chat message.
///
/// A violating message produces exactly one audit record, written in the
/// same store transaction as the message, and exactly one queued alert.
#[derive(Clone)]
pub struct ModerationPipeline {
    sessions: ChatSessions,
    chat: Arc<dyn ChatRepository>,
    questions: Arc<dyn QuestionRepository>,
    users: Arc<dyn UserRepository>,
    filter: Arc<ProfanityFilter>,
    alerts: AlertQueue,
}

impl ModerationPipeline {
    pub fn new(
        chat: Arc<dyn ChatRepository>,
        questions: Arc<dyn QuestionRepository>,
        users: Arc<dyn UserRepository>,
        filter: Arc<ProfanityFilter>,
        alerts: AlertQueue,
    ) -> Self {
        Self {
            sessions: ChatSessions::new(chat.clone()),
            chat,
            questions,
            users,
            filter,
            alerts,
        }
    }

    pub async fn submit(
        &self,
        session_id: Uuid,
        sender: &str,
        text: &str,
    ) -> ExpertResult<ChatMessage> {
        let sender = normalize_identity(sender);
        if sender.is_empty() {
            return Err(ExpertError::Validation("sender must not be empty".to_string()));
        }
        if text.trim().is_empty() {
            return Err(ExpertError::Validation("text must not be empty".to_string()));
        }

        self.sessions.ensure_open(session_id).await?;

        let redaction = self.filter.redact(text);
        let message = NewMessage {
            id: Uuid::new_v4(),
            session_id,
            sender: sender.clone(),
            original_text: text.to_string(),
            stored_text: redaction.text.clone(),
        };

        let audit = if redaction.violated {
            let offending_token = redaction.offending_token.clone().unwrap_or_default();
            Some(self.build_record(session_id, &sender, text, &redaction.text, offending_token).await)
        } else {
            None
        };

        let outcome = with_one_retry(|| self.chat.append_message(message.clone(), audit.clone())).await?;

        let stored = match outcome {
            AppendOutcome::Accepted(stored) => stored,
            AppendOutcome::SessionClosed => {
                tracing::info!(%session_id, "message rejected, session ended concurrently");
                return Err(ExpertError::Forbidden(ForbiddenReason::SessionClosed));
            }
        };

        if let Some(record) = audit {
            tracing::warn!(
                %session_id,
                sender = %stored.sender,
                offending_token = %record.offending_token,
                "message redacted"
            );
            self.alerts
                .enqueue(record.into_record(stored.id, stored.created_at));
        }

        Ok(stored)
    }

    /// Assemble the audit record. Every lookup is best-effort: a missing or
    /// failing question or user lookup leaves the snapshot empty instead of
    /// dropping the record.
    async fn build_record(
        &self,
        session_id: Uuid,
        sender: &str,
        original_text: &str,
        redacted_text: &str,
        offending_token: String,
    ) -> NewModerationRecord {
        let question = match self.questions.get_by_session(session_id).await {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "question lookup failed for audit record");
                None
            }
        };

        let (asker, expert) = match &question {
            Some(q) => (
                Some(self.snapshot(&q.asked_by).await),
                match &q.assigned_to {
                    Some(expert) => Some(self.snapshot(expert).await),
                    None => None,
                },
            ),
            None => (None, None),
        };

        NewModerationRecord {
            id: Uuid::new_v4(),
            session_id,
            sender: sender.to_string(),
            sender_role: sender_role(question.as_ref(), sender),
            original_text: original_text.to_string(),
            redacted_text: redacted_text.to_string(),
            offending_token,
            asker,
            expert,
            question_topic: question.as_ref().map(|q| q.topic.clone()),
            question_body: question.as_ref().map(|q| q.body.clone()),
        }
    }

    async fn snapshot(&self, identity: &str) -> ParticipantSnapshot {
        match self.users.get_by_email(identity).await {
            Ok(Some(user)) => ParticipantSnapshot::from(&user),
            Ok(None) => ParticipantSnapshot::unregistered(identity),
            Err(e) => {
                tracing::warn!(%identity, error = %e, "participant lookup failed for audit record");
                ParticipantSnapshot::unregistered(identity)
            }
        }
    }
}

fn sender_role(question: Option<&Question>, sender: &str) -> SenderRole {
    match question {
        Some(q) if q.asked_by == sender => SenderRole::Asker,
        Some(q) if q.assigned_to.as_deref() == Some(sender) => SenderRole::Expert,
        _ => SenderRole::Unknown,
    }
}
