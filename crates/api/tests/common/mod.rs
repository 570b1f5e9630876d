#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use centralauth_api::auth::credentials::CredentialIssuer;
use centralauth_api::auth::jwt::{JwtConfig, TokenCodec};
use centralauth_api::auth::lifecycle::SessionLifecycle;
use centralauth_api::auth::password::hash_password;
use centralauth_api::config::ServerConfig;
use centralauth_api::router::build_app_router;
use centralauth_api::state::AppState;
use centralauth_db::models::user::{CreateUser, User};
use centralauth_db::{MemoryStore, SessionStore, UserStore};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";
pub const TEST_PASSWORD: &str = "Secret123";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: TEST_SECRET.to_string(),
        access_token_expiry_mins: 15,
        refresh_token_expiry_mins: 7 * 24 * 60,
    }
}

/// Build a test `ServerConfig` with safe defaults.
///
/// Cookies are not marked `Secure` so assertions can read them over plain
/// HTTP requests.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        store_timeout: Duration::from_secs(5),
        secure_cookies: false,
        session_retention_hours: 168,
        jwt: test_jwt_config(),
    }
}

/// Build the engine facade directly over `store`.
pub fn build_lifecycle<S>(store: Arc<S>, operation_timeout: Duration) -> SessionLifecycle
where
    S: SessionStore + UserStore + 'static,
{
    let config = test_jwt_config();
    let codec = Arc::new(TokenCodec::new(&config.secret));
    let issuer = Arc::new(CredentialIssuer::from_config(codec, &config));
    SessionLifecycle::new(store.clone(), store, issuer, operation_timeout)
}

/// Build the full application router, with every middleware layer, over an
/// in-memory store.
pub fn build_test_app(store: Arc<MemoryStore>) -> Router {
    build_app_router(AppState::new(test_config(), store))
}

/// Insert a user with [`TEST_PASSWORD`].
pub async fn seed_user(store: &MemoryStore, username: &str, email: &str) -> User {
    store
        .create_user(CreateUser {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            phone_number: None,
            password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
        })
        .await
        .expect("user creation should succeed")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_json_with_headers(app, uri, body, &[]).await
}

pub async fn post_json_with_headers(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST with no body, only the given headers.
pub async fn post_empty(app: Router, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// All `Set-Cookie` header values of a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The `Set-Cookie` value for `name`, if present.
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&prefix))
}
