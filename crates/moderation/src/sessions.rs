use std::sync::Arc;

use expertline_common::error::{ExpertError, ExpertResult, ForbiddenReason};
use expertline_db::chat::models::{ChatMessage, ChatSession, SessionState};
use expertline_db::chat::repositories::ChatRepository;
use serde::Serialize;
use uuid::Uuid;

/// Messages of a session in arrival order plus its `ended` flag.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub session_id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub ended: bool,
}

/// Open -> Ended state machine over the chat store.
///
/// A session id with no record behaves as a fresh open session and is
/// materialized on the first write.
#[derive(Clone)]
pub struct ChatSessions {
    chat: Arc<dyn ChatRepository>,
}

impl ChatSessions {
    pub fn new(chat: Arc<dyn ChatRepository>) -> Self {
        Self { chat }
    }

    /// Current state without creating anything.
    pub async fn state(&self, session_id: Uuid) -> ExpertResult<SessionState> {
        Ok(self
            .chat
            .get_session(session_id)
            .await?
            .map(|s| s.state())
            .unwrap_or(SessionState::Open))
    }

    /// Reject with `SessionClosed` unless the session is open, creating it
    /// when absent. The store re-checks atomically on append; this early
    /// check only avoids moderation work for closed sessions.
    pub async fn ensure_open(&self, session_id: Uuid) -> ExpertResult<ChatSession> {
        let session = with_one_retry(|| self.chat.ensure_session(session_id)).await?;
        if session.ended {
            return Err(ExpertError::Forbidden(ForbiddenReason::SessionClosed));
        }
        Ok(session)
    }

    /// End the session. Ending an ended session is a successful no-op.
    pub async fn end(&self, session_id: Uuid) -> ExpertResult<ChatSession> {
        let outcome = with_one_retry(|| self.chat.end_session(session_id)).await?;
        if outcome.transitioned {
            tracing::info!(%session_id, "chat session ended");
        } else {
            tracing::debug!(%session_id, "chat session already ended");
        }
        Ok(outcome.session)
    }

    pub async fn transcript(&self, session_id: Uuid) -> ExpertResult<Transcript> {
        let ended = self.state(session_id).await? == SessionState::Ended;
        let messages = self.chat.list_messages(session_id).await?;
        Ok(Transcript {
            session_id,
            messages,
            ended,
        })
    }
}

/// Run a store operation, retrying once when it fails with `NotFound` or
/// `Conflict`, which a racing lazy session creation can produce.
pub(crate) async fn with_one_retry<T, F, Fut>(mut op: F) -> ExpertResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ExpertResult<T>>,
{
    match op().await {
        Err(e) if e.is_retryable() => {
            tracing::warn!(error = %e, "retrying session operation once");
            op().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expertline_db::chat::models::{AppendOutcome, NewMessage};
    use expertline_db::memory::MemoryStore;

    fn sessions(store: &MemoryStore) -> ChatSessions {
        ChatSessions::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn unknown_session_reads_as_open_without_creating() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert_eq!(sessions(&store).state(id).await.unwrap(), SessionState::Open);
        assert!(store.get_session(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ensure_open_materializes_missing_session() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        let session = sessions(&store).ensure_open(id).await.unwrap();
        assert!(!session.ended);
        assert!(store.get_session(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn end_is_idempotent() {
        let store = MemoryStore::new();
        let svc = sessions(&store);
        let id = Uuid::new_v4();

        let first = svc.end(id).await.unwrap();
        let second = svc.end(id).await.unwrap();
        assert!(first.ended && second.ended);
        assert_eq!(first, second);
        assert_eq!(svc.state(id).await.unwrap(), SessionState::Ended);
    }

    #[tokio::test]
    async fn ended_session_rejects_with_session_closed() {
        let store = MemoryStore::new();
        let svc = sessions(&store);
        let id = Uuid::new_v4();
        svc.end(id).await.unwrap();

        let result = svc.ensure_open(id).await;
        assert!(matches!(
            result,
            Err(ExpertError::Forbidden(ForbiddenReason::SessionClosed))
        ));
    }

    #[tokio::test]
    async fn transcript_reports_order_and_flag() {
        let store = MemoryStore::new();
        let svc = sessions(&store);
        let id = Uuid::new_v4();
        for text in ["one", "two", "three"] {
            let outcome = store
                .append_message(
                    NewMessage {
                        id: Uuid::new_v4(),
                        session_id: id,
                        sender: "a@example.com".to_string(),
                        original_text: text.to_string(),
                        stored_text: text.to_string(),
                    },
                    None,
                )
                .await
                .unwrap();
            assert!(matches!(outcome, AppendOutcome::Accepted(_)));
        }
        svc.end(id).await.unwrap();

        let transcript = svc.transcript(id).await.unwrap();
        assert!(transcript.ended);
        let texts: Vec<&str> = transcript
            .messages
            .iter()
            .map(|m| m.stored_text.as_str())
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn retry_helper_retries_conflict_once() {
        let mut calls = 0;
        let result: ExpertResult<u8> = with_one_retry(|| {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt == 1 {
                    Err(ExpertError::Conflict("race".to_string()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn retry_helper_does_not_retry_forbidden() {
        let mut calls = 0;
        let result: ExpertResult<u8> = with_one_retry(|| {
            calls += 1;
            async { Err(ExpertError::Forbidden(ForbiddenReason::SessionClosed)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
