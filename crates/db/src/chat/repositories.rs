use async_trait::async_trait;
use uuid::Uuid;

use crate::chat::models::{AppendOutcome, ChatMessage, ChatSession, EndOutcome, NewMessage};
use crate::moderation::models::NewModerationRecord;
use expertline_common::error::ExpertResult;

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Return the session, creating it open if absent.
    async fn ensure_session(&self, session_id: Uuid) -> ExpertResult<ChatSession>;
    async fn get_session(&self, session_id: Uuid) -> ExpertResult<Option<ChatSession>>;

    /// Conditional `ended: false -> true`. Creates the session if absent.
    /// Ending an ended session succeeds with `transitioned = false`.
    async fn end_session(&self, session_id: Uuid) -> ExpertResult<EndOutcome>;

    /// Append a message unless the session has ended. The check on `ended`,
    /// the audit record and the message are one atomic unit: either both rows
    /// are written against an open session or neither is.
    async fn append_message(
        &self,
        message: NewMessage,
        audit: Option<NewModerationRecord>,
    ) -> ExpertResult<AppendOutcome>;

    /// Messages of one session in arrival order.
    async fn list_messages(&self, session_id: Uuid) -> ExpertResult<Vec<ChatMessage>>;

    /// Most recent messages across all sessions, newest first.
    async fn list_recent(&self, limit: i64) -> ExpertResult<Vec<ChatMessage>>;
}
