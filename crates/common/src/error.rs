use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a request was refused. Each reason has a stable machine code that
/// callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForbiddenReason {
    Banned,
    SessionClosed,
    AdminRequired,
}

impl ForbiddenReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Banned => "banned",
            Self::SessionClosed => "session_closed",
            Self::AdminRequired => "admin_required",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Banned => "banned",
            Self::SessionClosed => "session closed",
            Self::AdminRequired => "admin access required",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExpertError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("forbidden: {}", .0.message())]
    Forbidden(ForbiddenReason),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExpertError {
    /// Errors on the session check-and-set that may come from a benign
    /// lazy-creation race and are worth one more attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Conflict(_))
    }
}

pub type ExpertResult<T> = Result<T, ExpertError>;
