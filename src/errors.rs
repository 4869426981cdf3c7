//! Caller-facing failures.
//!
//! Every variant is an internal reason code; [`AppError::category`] collapses
//! them into the handful of outcomes a client is allowed to distinguish.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Client,
    Conflict,
    Unauthorized,
    NotFound,
    Server,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("File is required.")]
    MissingFile,
    #[error("Email is already registered.")]
    DuplicateEmail,
    #[error("Password is incorrect.")]
    WrongPassword,
    #[error("User with the given email not found.")]
    UnknownEmail,
    #[error("User not found.")]
    UserNotFound,
    #[error("You are not authenticated.")]
    Unauthenticated,
    #[error("storage i/o failed: {0}")]
    Io(#[source] std::io::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::MissingFile => "missing_file",
            AppError::DuplicateEmail => "duplicate_email",
            AppError::WrongPassword => "wrong_password",
            AppError::UnknownEmail => "unknown_email",
            AppError::UserNotFound => "user_not_found",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Io(_) => "io",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            AppError::Validation(_) | AppError::MissingFile | AppError::WrongPassword => {
                Category::Client
            }
            AppError::DuplicateEmail => Category::Conflict,
            AppError::UnknownEmail | AppError::UserNotFound => Category::NotFound,
            AppError::Unauthenticated => Category::Unauthorized,
            AppError::Io(_) | AppError::Internal(_) => Category::Server,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.category() {
            Category::Client => StatusCode::BAD_REQUEST,
            Category::Conflict => StatusCode::CONFLICT,
            Category::Unauthorized => StatusCode::UNAUTHORIZED,
            Category::NotFound => StatusCode::NOT_FOUND,
            Category::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Response for a handler that panicked; the panic text is logged, never sent.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if self.category() == Category::Server {
            error!(error = ?self, code = self.code(), "request failed");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        let body = Json(ErrorBody {
            error: message,
            code: self.code(),
        });
        (status, body).into_response()
    }
}
