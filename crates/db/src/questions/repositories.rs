use async_trait::async_trait;
use uuid::Uuid;

use crate::questions::models::{Question, QuestionFilter};
use expertline_common::error::ExpertResult;

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist the question together with an open chat session sharing its
    /// session id. Both rows are written in one transaction; the session
    /// insert is idempotent, so a retry after a partial failure is safe.
    async fn create_with_session(&self, question: Question) -> ExpertResult<Question>;
    async fn get_by_session(&self, session_id: Uuid) -> ExpertResult<Option<Question>>;
    /// Oldest first.
    async fn list(&self, filter: QuestionFilter) -> ExpertResult<Vec<Question>>;
}
