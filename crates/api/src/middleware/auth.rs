//! Access-token extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use centralauth_core::error::CoreError;

use crate::error::AppError;
use crate::handlers::auth::ACCESS_TOKEN_COOKIE;
use crate::state::AppState;

/// Raw access token presented with the request.
///
/// Read from `Authorization: Bearer <token>`, falling back to the
/// `access_token` cookie. Only presence is checked here; the session engine
/// verifies the signature and resolves the session.
#[derive(Debug, Clone)]
pub struct AccessCredential(pub String);

impl FromRequestParts<AppState> for AccessCredential {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(header) = parts.headers.get(AUTHORIZATION) {
            let value = header.to_str().unwrap_or_default();
            let token = value.strip_prefix("Bearer ").ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Invalid Authorization format. Expected: Bearer <token>".into(),
                ))
            })?;
            return Ok(Self(token.trim().to_string()));
        }

        CookieJar::from_headers(&parts.headers)
            .get(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .map(Self)
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing access token".into()))
            })
    }
}
