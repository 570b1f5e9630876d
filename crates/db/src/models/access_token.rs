//! Access token model and DTOs.

use centralauth_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `access_tokens` table. `token` is the digest of the JWT.
#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub id: DbId,
    pub refresh_token_id: DbId,
    pub token: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for inserting an access token.
#[derive(Debug, Clone)]
pub struct CreateAccessToken {
    /// SHA-256 digest of the signed token.
    pub token_hash: String,
    pub expires_at: Timestamp,
}
