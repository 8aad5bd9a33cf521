use async_trait::async_trait;

use crate::moderation::models::{ModerationFilter, ModerationRecord};
use expertline_common::error::ExpertResult;

/// Read side of the audit trail. Records are written only through
/// `ChatRepository::append_message`.
#[async_trait]
pub trait ModerationRepository: Send + Sync {
    /// Newest first.
    async fn list(&self, filter: ModerationFilter) -> ExpertResult<Vec<ModerationRecord>>;
}
