use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use centralauth_core::error::CoreError;
use centralauth_db::StoreError;
use serde_json::json;

use crate::auth::error::AuthError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors, [`AuthError`] for session engine
/// failures and [`StoreError`] for direct storage calls. Implements
/// [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `centralauth_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A session engine failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A storage failure outside the engine (registration, health).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// Message for every credential failure. Expired, replayed and unknown
/// tokens are deliberately indistinguishable to the caller.
const UNAUTHORIZED_MESSAGE: &str = "Invalid or expired credentials";

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Core(CoreError::Unauthorized(msg)) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }

            // --- Session engine ---
            AppError::Auth(err) => classify_auth_error(err),

            // --- Storage ---
            AppError::Store(err) => classify_store_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

/// Map an engine failure to a response.
///
/// Credential failures all become the same 401. Infrastructure failures
/// become a sanitized 500 and are logged with their detail.
fn classify_auth_error(err: &AuthError) -> (StatusCode, &'static str, String) {
    match err {
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Invalid email or password".to_string(),
        ),
        AuthError::InvalidToken
        | AuthError::TokenExpired
        | AuthError::TokenReused
        | AuthError::SessionInvalid => {
            tracing::debug!(reason = %err, "Credential rejected");
            (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                UNAUTHORIZED_MESSAGE.to_string(),
            )
        }
        AuthError::Storage(store) => classify_store_error(store),
        AuthError::StorageTimeout => {
            tracing::error!("Session store deadline exceeded");
            internal()
        }
        AuthError::Signing(msg) => {
            tracing::error!(error = %msg, "Access token signing failed");
            internal()
        }
    }
}

/// Map a storage failure to a response.
///
/// - Unique violations map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::Conflict(constraint) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            conflict_message(constraint),
        ),
        other => {
            tracing::error!(error = %other, "Storage error");
            internal()
        }
    }
}

fn conflict_message(constraint: &str) -> String {
    match constraint {
        "uq_users_username" => "Username is already taken".to_string(),
        "uq_users_email" => "Email is already registered".to_string(),
        "uq_users_phone_number" => "Phone number is already registered".to_string(),
        other => format!("Duplicate value violates unique constraint: {other}"),
    }
}
