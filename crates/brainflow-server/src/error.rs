use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use brainflow_assist::AssistError;
use brainflow_shared::{EditError, TokenError};
use brainflow_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Content generation failed: {0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Too many requests, slow down")]
    TooManyRequests,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn outline_not_found() -> Self {
        ServerError::NotFound("Outline not found".into())
    }

    pub fn item_not_found() -> Self {
        ServerError::NotFound("Item not found".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Store(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::Store(detail) | ServerError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServerError::NotFound("Record not found".into()),
            StoreError::Conflict(what) => ServerError::BadRequest(what),
            other => ServerError::Store(other.to_string()),
        }
    }
}

impl From<AssistError> for ServerError {
    fn from(e: AssistError) -> Self {
        match e {
            AssistError::NotConfigured => ServerError::Unavailable(e.to_string()),
            AssistError::InvalidInput(msg) => ServerError::BadRequest(msg),
            other => ServerError::Upstream(other.to_string()),
        }
    }
}

impl From<EditError> for ServerError {
    fn from(e: EditError) -> Self {
        match e {
            EditError::ItemNotFound(_) | EditError::ParentNotFound(_) => {
                ServerError::NotFound(e.to_string())
            }
            EditError::WouldCycle { .. } | EditError::MissingField(_) => {
                ServerError::BadRequest(e.to_string())
            }
        }
    }
}

impl From<TokenError> for ServerError {
    fn from(e: TokenError) -> Self {
        ServerError::Unauthorized(e.to_string())
    }
}
