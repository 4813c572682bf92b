use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use sonar_context_engine::SonarContextError;
use thiserror::Error;
use tracing::{error, warn};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Missing credential or other server-side misconfiguration.
    #[error("{0}")]
    Config(String),

    /// Upstream answered with an error; its body is passed through.
    #[error("Upstream request failed with status {status}")]
    Upstream { status: u16, body: String },

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    GatewayTimeout(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            // 4xx
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            AppError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,

            // 5xx
            AppError::Config(_)
            | AppError::Upstream { .. }
            | AppError::Internal(_)
            | AppError::Bind(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream body as JSON when it parses, otherwise as a string.
    fn details(&self) -> Option<Value> {
        match self {
            AppError::Upstream { body, .. } if !body.trim().is_empty() => Some(
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone())),
            ),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        } else {
            warn!(%status, error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(err: axum::extract::rejection::QueryRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

/// Maps engine failures onto HTTP semantics.
impl From<SonarContextError> for AppError {
    fn from(err: SonarContextError) -> Self {
        match err {
            SonarContextError::Validation(msg) => AppError::BadRequest(msg),
            SonarContextError::NotFound(kind) => AppError::NotFound(kind.to_string()),
            SonarContextError::Config(e) => AppError::Config(e.to_string()),
            SonarContextError::Upstream { status, body } => AppError::Upstream { status, body },
            SonarContextError::RequestTimeout(budget) => {
                AppError::GatewayTimeout(format!("Request timed out after {budget:?}"))
            }
            e @ (SonarContextError::Transport(_)
            | SonarContextError::Timeout
            | SonarContextError::InvalidResponse(_)) => {
                AppError::Internal(format!("Failed to fetch issues from Sonar: {e}"))
            }
        }
    }
}
