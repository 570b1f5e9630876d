//! Tests for `AppError` to HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server or
//! store is involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use centralauth_api::auth::error::AuthError;
use centralauth_api::error::AppError;
use centralauth_core::error::CoreError;
use centralauth_db::StoreError;
use http_body_util::BodyExt;

/// Convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Core errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("email is required".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "email is required");
}

#[tokio::test]
async fn unauthorized_error_returns_401() {
    let err = AppError::Core(CoreError::Unauthorized("Missing access token".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["error"], "Missing access token");
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("Refresh token is required".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "Refresh token is required");
}

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::InternalError("Password hashing error: bad salt".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Session engine errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn credential_failures_share_one_response() {
    let mut bodies = Vec::new();
    for err in [
        AuthError::InvalidToken,
        AuthError::TokenExpired,
        AuthError::TokenReused,
        AuthError::SessionInvalid,
    ] {
        let (status, json) = error_to_response(AppError::Auth(err)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        bodies.push(json);
    }

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(bodies[0]["code"], "UNAUTHORIZED");
    assert_eq!(bodies[0]["error"], "Invalid or expired credentials");
}

#[tokio::test]
async fn invalid_credentials_returns_401() {
    let (status, json) = error_to_response(AppError::Auth(AuthError::InvalidCredentials)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid email or password");
}

#[tokio::test]
async fn storage_timeout_returns_500() {
    let (status, json) = error_to_response(AppError::Auth(AuthError::StorageTimeout)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn signing_failure_is_not_leaked() {
    let err = AppError::Auth(AuthError::Signing("key rejected".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unique_violation_returns_409_with_friendly_message() {
    let cases = [
        ("uq_users_username", "Username is already taken"),
        ("uq_users_email", "Email is already registered"),
        ("uq_users_phone_number", "Phone number is already registered"),
    ];
    for (constraint, message) in cases {
        let (status, json) = error_to_response(AppError::Store(StoreError::conflict(constraint))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "CONFLICT");
        assert_eq!(json["error"], message);
    }
}

#[tokio::test]
async fn engine_storage_failure_returns_500() {
    let err = AppError::Auth(AuthError::Storage(StoreError::not_found("session 9")));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
}
