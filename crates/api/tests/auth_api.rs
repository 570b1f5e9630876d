//! HTTP tests for the `/api/v1/auth` endpoints, run through the full
//! middleware stack over an in-memory store.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use centralauth_core::session::SessionStatus;
use centralauth_core::tokens::hash_token;
use centralauth_db::{MemoryStore, SessionStore};
use common::{
    body_json, build_test_app, get, post_empty, post_json, post_json_with_headers, seed_user,
    set_cookie, TEST_PASSWORD,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn registration(username: &str, email: &str) -> Value {
    json!({
        "first_name": "Grace",
        "last_name": "Hopper",
        "username": username,
        "email": email,
        "password": "Compiler1952",
        "confirm_password": "Compiler1952",
    })
}

async fn login(store: &Arc<MemoryStore>) -> Value {
    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/auth/login",
        json!({ "email": "ada@example.com", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_creates_user() {
    let store = Arc::new(MemoryStore::new());
    let app = build_test_app(store.clone());

    let response = post_json(
        app,
        "/api/v1/auth/register",
        registration("grace", "grace@example.com"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["user_id"].as_i64().is_some());

    // The new account can log in straight away.
    let login = post_json(
        build_test_app(store),
        "/api/v1/auth/login",
        json!({ "email": "grace", "password": "Compiler1952" }),
    )
    .await;
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_duplicate_email_conflicts() {
    let store = Arc::new(MemoryStore::new());

    let first = post_json(
        build_test_app(store.clone()),
        "/api/v1/auth/register",
        registration("grace", "grace@example.com"),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = post_json(
        build_test_app(store),
        "/api/v1/auth/register",
        registration("hopper", "grace@example.com"),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second).await;
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["error"], "Email is already registered");
}

#[tokio::test]
async fn register_rejects_mismatched_confirmation() {
    let store = Arc::new(MemoryStore::new());
    let mut payload = registration("grace", "grace@example.com");
    payload["confirm_password"] = json!("Different1952");

    let response = post_json(build_test_app(store), "/api/v1/auth/register", payload).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("confirm_password"));
}

#[tokio::test]
async fn username_cannot_shadow_another_accounts_email() {
    let store = Arc::new(MemoryStore::new());

    let squat = post_json(
        build_test_app(store.clone()),
        "/api/v1/auth/register",
        registration("victim@x.com", "squatter@example.com"),
    )
    .await;
    assert_eq!(squat.status(), StatusCode::BAD_REQUEST);

    let victim = post_json(
        build_test_app(store.clone()),
        "/api/v1/auth/register",
        registration("victim", "victim@x.com"),
    )
    .await;
    assert_eq!(victim.status(), StatusCode::CREATED);

    let login = post_json(
        build_test_app(store),
        "/api/v1/auth/login",
        json!({ "email": "victim@x.com", "password": "Compiler1952" }),
    )
    .await;
    assert_eq!(login.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_returns_tokens_and_sets_cookies() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "ada", "ada@example.com").await;

    let response = post_json_with_headers(
        build_test_app(store.clone()),
        "/api/v1/auth/login",
        json!({ "email": "ada@example.com", "password": TEST_PASSWORD }),
        &[(
            "user-agent",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Chrome/126.0 Safari/537.36",
        )],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let access_cookie = set_cookie(&response, "access_token").expect("access cookie");
    let refresh_cookie = set_cookie(&response, "refresh_token").expect("refresh cookie");
    for cookie in [&access_cookie, &refresh_cookie] {
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("SameSite=Strict"), "{cookie}");
        assert!(cookie.contains("Path=/"), "{cookie}");
        assert!(cookie.contains("Max-Age="), "{cookie}");
    }

    let body = body_json(response).await;
    assert_eq!(body["user_id"], user.id);
    assert!(body["expire_at"].as_i64().unwrap() > chrono::Utc::now().timestamp());
    let refresh_token = body["refresh_token"].as_str().unwrap();
    assert!(refresh_cookie.starts_with(&format!("refresh_token={refresh_token}")));
    assert!(!body["access_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_records_peer_address_without_proxy_headers() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "ada", "ada@example.com").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("content-type", "application/json")
        .extension(ConnectInfo(SocketAddr::from(([198, 51, 100, 4], 40000))))
        .body(Body::from(
            json!({ "email": "ada", "password": TEST_PASSWORD }).to_string(),
        ))
        .unwrap();
    let response = build_test_app(store.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let refresh_hash = hash_token(body["refresh_token"].as_str().unwrap());
    let record = store.find_refresh_token(&refresh_hash).await.unwrap().unwrap();
    let session = store
        .find_session(record.token.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.ip_address.as_deref(), Some("198.51.100.4"));
}

#[tokio::test]
async fn login_wrong_password_is_unauthorized() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "ada", "ada@example.com").await;

    let response = post_json(
        build_test_app(store),
        "/api/v1/auth/login",
        json!({ "email": "ada@example.com", "password": "WrongPassword9" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response, "access_token").is_none());
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn login_with_empty_email_is_bad_request() {
    let store = Arc::new(MemoryStore::new());

    let response = post_json(
        build_test_app(store),
        "/api/v1/auth/login",
        json!({ "email": "  ", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_with_body_token_rotates() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "ada", "ada@example.com").await;
    let session = login(&store).await;
    let old = session["refresh_token"].as_str().unwrap();

    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": old }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "refresh_token").is_some());
    let body = body_json(response).await;
    assert_ne!(body["refresh_token"].as_str().unwrap(), old);
    assert_eq!(body["user_id"], session["user_id"]);
}

#[tokio::test]
async fn refresh_prefers_cookie_over_body() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "ada", "ada@example.com").await;
    let session = login(&store).await;
    let cookie = format!(
        "refresh_token={}",
        session["refresh_token"].as_str().unwrap()
    );

    let response = post_json_with_headers(
        build_test_app(store),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": "not-a-real-token" }),
        &[("cookie", cookie.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_token_is_bad_request() {
    let store = Arc::new(MemoryStore::new());

    let response = post_empty(build_test_app(store), "/api/v1/auth/refresh", &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["error"], "Refresh token is required");
}

#[tokio::test]
async fn refresh_replay_is_generic_unauthorized() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "ada", "ada@example.com").await;
    let session = login(&store).await;
    let old = session["refresh_token"].as_str().unwrap();

    let first = post_json(
        build_test_app(store.clone()),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": old }),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let replay = post_json(
        build_test_app(store.clone()),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": old }),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(replay).await;
    assert_eq!(body["error"], "Invalid or expired credentials");

    // An unknown token gets the very same answer.
    let unknown = post_json(
        build_test_app(store),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": "0000" }),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(unknown).await, body);
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logout_with_bearer_ends_session_and_clears_cookies() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "ada", "ada@example.com").await;
    let session = login(&store).await;
    let bearer = format!("Bearer {}", session["access_token"].as_str().unwrap());

    let response = post_empty(
        build_test_app(store.clone()),
        "/api/v1/auth/logout",
        &[("authorization", bearer.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    for name in ["access_token", "refresh_token"] {
        let cookie = set_cookie(&response, name).expect("cleared cookie");
        assert!(cookie.contains("Max-Age=0"), "{cookie}");
    }
    assert_eq!(body_json(response).await, json!({ "success": true }));

    let refresh_hash = hash_token(session["refresh_token"].as_str().unwrap());
    let record = store.find_refresh_token(&refresh_hash).await.unwrap().unwrap();
    assert!(record.token.revoked);

    // Repeating the logout still succeeds.
    let again = post_empty(
        build_test_app(store.clone()),
        "/api/v1/auth/logout",
        &[("authorization", bearer.as_str())],
    )
    .await;
    assert_eq!(again.status(), StatusCode::OK);

    let refresh = post_json(
        build_test_app(store),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": session["refresh_token"] }),
    )
    .await;
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_with_cookie_marks_session_logged_out() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "ada", "ada@example.com").await;
    let session = login(&store).await;
    let cookie = format!("access_token={}", session["access_token"].as_str().unwrap());

    let response = post_empty(
        build_test_app(store.clone()),
        "/api/v1/auth/logout",
        &[("cookie", cookie.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let refresh_hash = hash_token(session["refresh_token"].as_str().unwrap());
    let record = store.find_refresh_token(&refresh_hash).await.unwrap().unwrap();
    assert_eq!(record.session_status, SessionStatus::LoggedOut);
}

#[tokio::test]
async fn logout_without_token_is_unauthorized() {
    let store = Arc::new(MemoryStore::new());

    let response = post_empty(build_test_app(store), "/api/v1/auth/logout", &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

// ---------------------------------------------------------------------------
// Health and middleware
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_store_status() {
    let store = Arc::new(MemoryStore::new());

    let response = get(build_test_app(store), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db_healthy"], true);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let store = Arc::new(MemoryStore::new());

    let response = get(build_test_app(store), "/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let store = Arc::new(MemoryStore::new());

    let response = get(build_test_app(store), "/api/v1/auth/sessions").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
