//! Repository for the `refresh_tokens` table.

use centralauth_core::types::{DbId, Timestamp, TokenFamily};
use sqlx::PgExecutor;

use crate::models::refresh_token::{CreateRefreshToken, RefreshToken, RefreshTokenRecord};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, token, client_id, token_family, previous_token_id, \
                       expires_at, revoked, created_at";

/// Provides the rotation-chain queries for refresh tokens.
pub struct RefreshTokenRepo;

impl RefreshTokenRepo {
    /// Insert a refresh token for `session_id`, returning the created row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        session_id: DbId,
        input: &CreateRefreshToken,
    ) -> Result<RefreshToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO refresh_tokens
                (session_id, token, client_id, token_family, previous_token_id, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(session_id)
            .bind(&input.token_hash)
            .bind(&input.client_id)
            .bind(input.token_family)
            .bind(input.previous_token_id)
            .bind(input.expires_at)
            .fetch_one(executor)
            .await
    }

    /// Find a token by its digest, joined with its session's owner and status.
    pub async fn find_record_by_hash<'e, E: PgExecutor<'e>>(
        executor: E,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT rt.id, rt.session_id, rt.token, rt.client_id, rt.token_family,
                    rt.previous_token_id, rt.expires_at, rt.revoked, rt.created_at,
                    s.user_id, s.status AS session_status
             FROM refresh_tokens rt
             JOIN sessions s ON s.id = rt.session_id
             WHERE rt.token = $1",
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await
    }

    /// List every token of a session, oldest first.
    pub async fn list_for_session<'e, E: PgExecutor<'e>>(
        executor: E,
        session_id: DbId,
    ) -> Result<Vec<RefreshToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM refresh_tokens WHERE session_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(session_id)
            .fetch_all(executor)
            .await
    }

    /// Compare-and-set: revoke the token only if it is still unrevoked.
    ///
    /// Returns `true` for exactly one caller per token. Concurrent callers
    /// block on the row lock and then see zero affected rows.
    pub async fn revoke_if_unrevoked<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE id = $1 AND revoked = false")
                .bind(id)
                .execute(executor)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every token in a family. Returns the count of newly revoked rows.
    pub async fn revoke_family<'e, E: PgExecutor<'e>>(
        executor: E,
        family: TokenFamily,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = true WHERE token_family = $1 AND revoked = false",
        )
        .bind(family)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Revoke every token of a session. Returns the count of newly revoked rows.
    pub async fn revoke_all_for_session<'e, E: PgExecutor<'e>>(
        executor: E,
        session_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = true WHERE session_id = $1 AND revoked = false",
        )
        .bind(session_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete tokens that expired before `cutoff`. Their access tokens
    /// go with them through `ON DELETE CASCADE`.
    pub async fn purge_expired<'e, E: PgExecutor<'e>>(
        executor: E,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
