use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Application error taxonomy.
///
/// Domain errors map to 4xx responses with a stable `error` kind so clients
/// can branch on the reason; infrastructure errors (pool, SQLite) map to a
/// generic 500 and are logged server-side.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Action is illegal for the current lifecycle state (e.g. joining a
    /// closed project, responding to a non-pending request).
    #[error("{0}")]
    InvalidState(String),

    /// Role was at capacity at commit time.
    #[error("{0}")]
    CapacityConflict(String),

    /// Repeat join/exchange request, self-application, or unique-key clash.
    #[error("{0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind for the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidState(_) => "invalid_state",
            AppError::CapacityConflict(_) => "capacity_conflict",
            AppError::Duplicate(_) => "duplicate",
            AppError::Database(_) | AppError::Pool(_) => "infrastructure",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::CapacityConflict(_) => StatusCode::CONFLICT,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Don't leak SQL/pool details to clients.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("database error: {e}");
                "internal server error".to_string()
            }
            AppError::Pool(e) => {
                tracing::error!("connection pool error: {e}");
                "internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = axum::Json(serde_json::json!({
            "error": self.kind(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
