//! Handlers for the `/auth` resource (register, login, refresh, logout).

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::CookieJar;
use centralauth_core::types::{DbId, Timestamp};
use centralauth_core::validation::{validate_login, validate_registration, RegistrationInput};
use centralauth_db::models::user::CreateUser;
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};

use crate::auth::credentials::IssuedCredentials;
use crate::auth::lifecycle::Credential;
use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AccessCredential;
use crate::middleware::device::ClientDevice;
use crate::state::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: DbId,
}

/// Request body for `POST /auth/login`. `email` also accepts a username.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Optional request body for `POST /auth/refresh` when no cookie is sent.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: DbId,
    /// Access token expiry (UTC Unix timestamp).
    pub expire_at: i64,
}

impl From<&IssuedCredentials> for AuthResponse {
    fn from(issued: &IssuedCredentials) -> Self {
        Self {
            access_token: issued.access_token.clone(),
            refresh_token: issued.refresh_token.clone(),
            user_id: issued.user_id,
            expire_at: issued.access_expires_at.timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account. Returns 201 with the new user id.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let phone_number = input
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    validate_registration(&RegistrationInput {
        first_name: &input.first_name,
        last_name: &input.last_name,
        phone_number,
        username: &input.username,
        email: &input.email,
        password: &input.password,
        confirm_password: &input.confirm_password,
    })?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = state
        .users
        .create_user(CreateUser {
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            phone_number: phone_number.map(str::to_string),
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id: user.id })))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email (or username) + password. Returns access and
/// refresh tokens in the body and as cookies.
pub async fn login(
    State(state): State<AppState>,
    ClientDevice(device): ClientDevice,
    jar: CookieJar,
    Json(input): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    validate_login(&input.email, &input.password)?;

    let issued = state
        .lifecycle
        .login(input.email.trim(), &input.password, device)
        .await?;

    let jar = set_auth_cookies(jar, &issued, state.config.secure_cookies);
    Ok((jar, Json(AuthResponse::from(&issued))))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token (cookie first, then JSON body) for a new token
/// pair. Both cookies are replaced.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let refresh_token = refresh_token_from(&jar, &body)?;

    let issued = state.lifecycle.refresh(&refresh_token).await?;

    let jar = set_auth_cookies(jar, &issued, state.config.secure_cookies);
    Ok((jar, Json(AuthResponse::from(&issued))))
}

/// POST /api/v1/auth/logout
///
/// End the session owning the presented access token and clear cookies.
/// Repeating the call for an ended session still succeeds.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    AccessCredential(token): AccessCredential,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    state.lifecycle.logout(Credential::Access(&token)).await?;

    let jar = clear_auth_cookies(jar, state.config.secure_cookies);
    Ok((jar, Json(LogoutResponse { success: true })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn refresh_token_from(jar: &CookieJar, body: &[u8]) -> AppResult<String> {
    if let Some(cookie) = jar.get(REFRESH_TOKEN_COOKIE).filter(|c| !c.value().is_empty()) {
        return Ok(cookie.value().to_string());
    }

    let request: RefreshRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice(body)
            .map_err(|_| AppError::BadRequest("Could not parse request body".into()))?
    };

    request
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Refresh token is required".into()))
}

fn auth_cookie(
    name: &'static str,
    value: String,
    expires_at: Timestamp,
    secure: bool,
) -> Cookie<'static> {
    let remaining = (expires_at - chrono::Utc::now()).num_seconds().max(0);
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(remaining))
        .build()
}

fn set_auth_cookies(jar: CookieJar, issued: &IssuedCredentials, secure: bool) -> CookieJar {
    jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        issued.access_token.clone(),
        issued.access_expires_at,
        secure,
    ))
    .add(auth_cookie(
        REFRESH_TOKEN_COOKIE,
        issued.refresh_token.clone(),
        issued.refresh_expires_at,
        secure,
    ))
}

fn clear_auth_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    let expired = |name: &'static str| {
        Cookie::build((name, ""))
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(time::Duration::ZERO)
            .build()
    };
    jar.add(expired(ACCESS_TOKEN_COOKIE))
        .add(expired(REFRESH_TOKEN_COOKIE))
}
