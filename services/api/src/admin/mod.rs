pub mod handlers;
pub mod requests;
pub mod responses;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

/// Every route here requires an `AdminCaller`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(handlers::list_users))
        .route("/api/admin/users/{id}", post(handlers::update_user))
        .route("/api/admin/chats", get(handlers::list_chats))
        .route("/api/admin/moderation", get(handlers::list_moderation))
        .route("/api/admin/bans", get(handlers::list_bans))
        .route("/api/admin/bans/identity", post(handlers::ban_identity))
        .route("/api/admin/bans/address", post(handlers::ban_address))
}
