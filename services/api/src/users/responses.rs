use chrono::{DateTime, Utc};
use expertline_db::users::models::User;
use serde::Serialize;
use uuid::Uuid;

use crate::ask::responses::QuestionResponse;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub expertise: Vec<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            expertise: u.expertise,
            is_admin: u.is_admin,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListQuestionsResponse {
    pub data: Vec<QuestionResponse>,
    pub count: usize,
}
