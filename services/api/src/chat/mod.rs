pub mod handlers;
pub mod requests;
pub mod responses;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/chat/{session_id}",
            get(handlers::get_transcript).post(handlers::post_message),
        )
        .route("/api/chat/{session_id}/end", post(handlers::end_session))
}
