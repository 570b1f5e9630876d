//! Repository for the `access_tokens` table.

use centralauth_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::access_token::{AccessToken, CreateAccessToken};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, refresh_token_id, token, expires_at, created_at";

pub struct AccessTokenRepo;

impl AccessTokenRepo {
    /// Insert an access token bound to `refresh_token_id`.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        refresh_token_id: DbId,
        input: &CreateAccessToken,
    ) -> Result<AccessToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO access_tokens (refresh_token_id, token, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(refresh_token_id)
            .bind(&input.token_hash)
            .bind(input.expires_at)
            .fetch_one(executor)
            .await
    }

    /// Resolve the session owning an access token digest.
    pub async fn find_session_id_by_hash<'e, E: PgExecutor<'e>>(
        executor: E,
        token_hash: &str,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT rt.session_id
             FROM access_tokens a
             JOIN refresh_tokens rt ON rt.id = a.refresh_token_id
             WHERE a.token = $1",
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await
    }
}
