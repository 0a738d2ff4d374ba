use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    models::MessageResponse, repository::RepositoryError, session::SessionError,
    storage::StorageError,
};

// User-facing messages. The portal's audience is French-speaking.
pub const MSG_INVALID_CREDENTIALS: &str = "Identifiants incorrects";
pub const MSG_ACCESS_DENIED: &str = "Accès refusé";
pub const MSG_NOT_AUTHENTICATED: &str = "Non authentifié";
pub const MSG_NOT_FOUND: &str = "Introuvable";
pub const MSG_UPLOAD_FAILED: &str = "Échec de l'upload du fichier";
pub const MSG_INTERNAL: &str = "Erreur interne du serveur";

/// AppError
///
/// The single error type returned by handlers, extractors and middleware.
/// Each variant maps to one HTTP status and one static message; the detailed
/// cause is only ever written to the log.
#[derive(Error, Debug)]
pub enum AppError {
    /// Validation failure carrying the message shown to the client.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not authenticated")]
    Unauthorized,

    #[error("access denied")]
    Forbidden,

    #[error("no such route")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("password hashing error: {0}")]
    PasswordHashing(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Storage(_)
            | AppError::Repository(_)
            | AppError::Session(_)
            | AppError::PasswordHashing(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::InvalidCredentials => MSG_INVALID_CREDENTIALS.to_string(),
            AppError::Unauthorized => MSG_NOT_AUTHENTICATED.to_string(),
            AppError::Forbidden => MSG_ACCESS_DENIED.to_string(),
            AppError::NotFound => MSG_NOT_FOUND.to_string(),
            AppError::Storage(_) => MSG_UPLOAD_FAILED.to_string(),
            _ => MSG_INTERNAL.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, Json(MessageResponse::failure(self.user_message()))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
