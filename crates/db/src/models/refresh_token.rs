//! Refresh token model and DTOs.

use centralauth_core::session::SessionStatus;
use centralauth_core::types::{DbId, Timestamp, TokenFamily};
use sqlx::FromRow;

/// A row from the `refresh_tokens` table. `token` is the stored digest.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: DbId,
    pub session_id: DbId,
    pub token: String,
    pub client_id: Option<String>,
    pub token_family: TokenFamily,
    pub previous_token_id: Option<DbId>,
    pub expires_at: Timestamp,
    pub revoked: bool,
    pub created_at: Timestamp,
}

/// A refresh token joined with the state of its owning session.
///
/// This is everything the rotation engine needs to classify a presented
/// token without a second round trip.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    #[sqlx(flatten)]
    pub token: RefreshToken,
    pub user_id: DbId,
    #[sqlx(try_from = "String")]
    pub session_status: SessionStatus,
}

/// DTO for inserting a refresh token.
#[derive(Debug, Clone)]
pub struct CreateRefreshToken {
    /// SHA-256 digest of the opaque value.
    pub token_hash: String,
    pub client_id: Option<String>,
    pub token_family: TokenFamily,
    pub previous_token_id: Option<DbId>,
    pub expires_at: Timestamp,
}
