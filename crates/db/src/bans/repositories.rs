use async_trait::async_trait;

use crate::bans::models::{Ban, BanKind};
use expertline_common::error::ExpertResult;

#[async_trait]
pub trait BanRepository: Send + Sync {
    async fn is_banned(&self, kind: BanKind, value: &str) -> ExpertResult<bool>;
    /// Banning an already banned value returns the existing ban.
    async fn add(&self, kind: BanKind, value: &str, reason: Option<String>) -> ExpertResult<Ban>;
    async fn list(&self) -> ExpertResult<Vec<Ban>>;
}
