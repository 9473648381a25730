//! Domain error taxonomy and the single point where errors become HTTP
//! responses. Services and handlers raise typed errors; nothing below this
//! layer formats a response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("token is invalid or expired")]
    InvalidToken,

    #[error("token has been revoked")]
    RevokedToken,

    #[error("access token required")]
    AccessTokenRequired,

    #[error("refresh token required")]
    RefreshTokenRequired,

    #[error("insufficient permissions")]
    InsufficientPermission,

    #[error("account not verified")]
    AccountNotVerified,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("book not found")]
    BookNotFound,

    #[error("review not found")]
    ReviewNotFound,

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("request validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, error_code, resolution) = match &self {
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token is invalid or expired",
                "invalid_token",
                Some("Please get a new token"),
            ),
            AppError::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "Token is invalid or has been revoked",
                "token_revoked",
                Some("Please get a new token"),
            ),
            AppError::AccessTokenRequired => (
                StatusCode::UNAUTHORIZED,
                "Please provide a valid access token",
                "access_token_required",
                Some("Please get an access token"),
            ),
            AppError::RefreshTokenRequired => (
                StatusCode::FORBIDDEN,
                "Please provide a valid refresh token",
                "refresh_token_required",
                Some("Please get a refresh token"),
            ),
            AppError::InsufficientPermission => (
                StatusCode::UNAUTHORIZED,
                "You do not have enough permissions to perform this action",
                "insufficient_permissions",
                None,
            ),
            AppError::AccountNotVerified => (
                StatusCode::FORBIDDEN,
                "Account not verified",
                "account_not_verified",
                Some("Please check your email for verification details"),
            ),
            AppError::UserAlreadyExists => (
                StatusCode::FORBIDDEN,
                "User already exists",
                "user_already_exists",
                None,
            ),
            AppError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "User not found",
                "user_not_found",
                None,
            ),
            AppError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                "Invalid email or password",
                "invalid_email_or_password",
                None,
            ),
            AppError::PasswordMismatch => (
                StatusCode::BAD_REQUEST,
                "Passwords do not match",
                "passwords_do_not_match",
                None,
            ),
            AppError::BookNotFound => (
                StatusCode::NOT_FOUND,
                "Book not found",
                "book_not_found",
                None,
            ),
            AppError::ReviewNotFound => (
                StatusCode::NOT_FOUND,
                "Review not found",
                "review_not_found",
                None,
            ),
            AppError::MalformedBody(detail) => (
                StatusCode::BAD_REQUEST,
                detail.as_str(),
                "invalid_request_body",
                None,
            ),
            AppError::Validation(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                detail.as_str(),
                "validation_error",
                None,
            ),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                server_error()
            }
            AppError::Redis(e) => {
                tracing::error!(error = %e, "Redis error");
                server_error()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                server_error()
            }
        };

        (
            status,
            Json(ErrorBody {
                message,
                error_code,
                resolution,
            }),
        )
            .into_response()
    }
}

fn server_error() -> (StatusCode, &'static str, &'static str, Option<&'static str>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Oops! Something went wrong",
        "server_error",
        None,
    )
}

impl AppError {
    /// Stable machine-readable code, also used by tests.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidToken => "invalid_token",
            AppError::RevokedToken => "token_revoked",
            AppError::AccessTokenRequired => "access_token_required",
            AppError::RefreshTokenRequired => "refresh_token_required",
            AppError::InsufficientPermission => "insufficient_permissions",
            AppError::AccountNotVerified => "account_not_verified",
            AppError::UserAlreadyExists => "user_already_exists",
            AppError::UserNotFound => "user_not_found",
            AppError::InvalidCredentials => "invalid_email_or_password",
            AppError::PasswordMismatch => "passwords_do_not_match",
            AppError::BookNotFound => "book_not_found",
            AppError::ReviewNotFound => "review_not_found",
            AppError::MalformedBody(_) => "invalid_request_body",
            AppError::Validation(_) => "validation_error",
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => "server_error",
        }
    }
}
