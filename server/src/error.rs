//! Unified error handling for the server.

use crate::envelope::Envelope;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use finance_engine::Error as EngineError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl AppError {
    /// Status code reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Engine(e) => match e {
                EngineError::NotFound(_)
                | EngineError::Lookup { .. }
                | EngineError::Unavailable(_) => StatusCode::NOT_FOUND,
                EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                EngineError::Store(_)
                | EngineError::SearchUnavailable(_)
                | EngineError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Backend details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Engine(EngineError::NotFound(id))
            | AppError::Engine(EngineError::Lookup { id, .. }) => {
                format!("account {id} not found")
            }
            AppError::Engine(EngineError::Unavailable(_)) => "accounts not found".to_string(),
            AppError::Engine(EngineError::InvalidInput(msg)) => msg.clone(),
            AppError::BadRequest(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::MethodNotAllowed => "method not allowed".to_string(),
            AppError::Engine(_) | AppError::Encoding(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Encoding(e) = &self {
            tracing::error!("Encoding error: {:?}", e);
        }
        Envelope::error(self.status(), self.public_message()).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
