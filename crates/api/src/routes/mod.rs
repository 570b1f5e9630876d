pub mod auth;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                 POST  create an account
/// /auth/login                    POST  open a session
/// /auth/refresh                  POST  rotate the refresh token
/// /auth/logout                   POST  end the current session
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/auth", auth::router())
}
