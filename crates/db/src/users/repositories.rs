use async_trait::async_trait;
use uuid::Uuid;

use crate::users::models::{NewUser, User, UserUpdate};
use expertline_common::error::ExpertResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Duplicate email yields `Conflict`.
    async fn create(&self, user: NewUser) -> ExpertResult<User>;
    async fn get_by_id(&self, id: Uuid) -> ExpertResult<Option<User>>;
    async fn get_by_email(&self, email: &str) -> ExpertResult<Option<User>>;
    /// All users in registration order.
    async fn list(&self) -> ExpertResult<Vec<User>>;
    async fn update(&self, id: Uuid, update: UserUpdate) -> ExpertResult<User>;
}

/// Read-only lookup of an expert by declared expertise.
#[async_trait]
pub trait ExpertDirectory: Send + Sync {
    /// First non-banned user, in registration order, whose expertise
    /// intersects `candidates`. Candidates must already be normalized.
    async fn find_expert(&self, candidates: &[String]) -> ExpertResult<Option<User>>;
}
