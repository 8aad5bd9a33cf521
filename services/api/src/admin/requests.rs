use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub expertise: Option<Vec<String>>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChatsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationQuery {
    pub session_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BanIdentityRequest {
    pub identity: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BanAddressRequest {
    pub address: String,
    pub reason: Option<String>,
}
