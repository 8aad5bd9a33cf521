use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use expertline_common::error::ExpertError;

pub struct ApiError(pub ExpertError);

impl From<ExpertError> for ApiError {
    fn from(err: ExpertError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            ExpertError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg }))
            }
            ExpertError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ExpertError::Forbidden(reason) => (
                StatusCode::FORBIDDEN,
                serde_json::json!({ "error": reason.message(), "code": reason.code() }),
            ),
            ExpertError::Conflict(msg) => {
                (StatusCode::CONFLICT, serde_json::json!({ "error": msg }))
            }
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": other.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expertline_common::error::ForbiddenReason;

    async fn render(err: ExpertError) -> (StatusCode, serde_json::Value) {
        let resp = ApiError(err).into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn forbidden_carries_stable_code() {
        let (status, body) = render(ExpertError::Forbidden(ForbiddenReason::SessionClosed)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "session_closed");
        assert_eq!(body["error"], "session closed");

        let (_, body) = render(ExpertError::Forbidden(ForbiddenReason::Banned)).await;
        assert_eq!(body["code"], "banned");
    }

    #[tokio::test]
    async fn status_mapping() {
        assert_eq!(
            render(ExpertError::NotFound("x".into())).await.0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            render(ExpertError::Validation("x".into())).await.0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            render(ExpertError::Conflict("x".into())).await.0,
            StatusCode::CONFLICT
        );
        let (status, body) = render(ExpertError::Database("boom".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("code").is_none());
    }
}
