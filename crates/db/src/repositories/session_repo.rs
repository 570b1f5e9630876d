//! Repository for the `sessions` table.

use centralauth_core::session::SessionStatus;
use centralauth_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::session::{CreateSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, device_name, ip_address, user_agent, status, \
                       created_at, updated_at, last_accessed_at";

/// Provides CRUD operations for sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new `active` session, returning the created row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateSession,
    ) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions (user_id, device_name, ip_address, user_agent, status)
             VALUES ($1, $2, $3, $4, 'active')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(input.user_id)
            .bind(&input.device.device_name)
            .bind(&input.device.ip_address)
            .bind(&input.device.user_agent)
            .fetch_one(executor)
            .await
    }

    /// Find a session by internal ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Record activity on an active session.
    pub async fn touch<'e, E: PgExecutor<'e>>(executor: E, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sessions SET last_accessed_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Move an `active` session to a terminal status.
    ///
    /// Returns `false` when the session was already terminal (or missing),
    /// which leaves the first terminal status in place.
    pub async fn end_if_active<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        status: SessionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET status = $2 WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lock a session row until the surrounding transaction ends.
    ///
    /// Writers that touch a session's token chain take this lock first, so
    /// a logout and a rotation on the same session run one after the other.
    pub async fn lock_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT id FROM sessions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(())
    }

    /// Delete sessions, whatever their status, that own no refresh tokens
    /// and have seen no activity since before `cutoff`.
    ///
    /// A session that simply ran out of tokens stays `active`, so status
    /// alone cannot select what to delete.
    pub async fn purge_orphaned<'e, E: PgExecutor<'e>>(
        executor: E,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM sessions s
             WHERE GREATEST(s.updated_at, s.last_accessed_at) < $1
               AND NOT EXISTS (SELECT 1 FROM refresh_tokens rt WHERE rt.session_id = s.id)",
        )
        .bind(cutoff)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
