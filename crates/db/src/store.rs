//! Storage contracts consumed by the auth engine.
//!
//! [`SessionStore`] covers sessions and the refresh/access token chain;
//! [`UserStore`] covers the identity lookups login and registration need.
//! Both are implemented by [`PgStore`](crate::pg_store::PgStore) and
//! [`MemoryStore`](crate::memory_store::MemoryStore).
//!
//! Every method that writes more than one row is atomic: callers never
//! observe a session without its head token or a half-revoked family.

use async_trait::async_trait;
use centralauth_core::session::SessionStatus;
use centralauth_core::types::{DbId, Timestamp, TokenFamily};

use crate::models::access_token::{AccessToken, CreateAccessToken};
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken, RefreshTokenRecord};
use crate::models::session::{DeviceInfo, Session};
use crate::models::user::{CreateUser, User};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A unique index rejected the write. Carries the index name.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Requested row was not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(constraint: impl Into<String>) -> Self {
        Self::Conflict(constraint.into())
    }

    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<sqlx::Error> for StoreError {
    /// PostgreSQL unique violations (SQLSTATE 23505) on a `uq_*` index become
    /// [`StoreError::Conflict`]; everything else stays a database error.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                if let Some(constraint) = db_err.constraint().filter(|c| c.starts_with("uq_")) {
                    return Self::Conflict(constraint.to_string());
                }
            }
        }
        Self::Database(err)
    }
}

// =============================================================================
// Write DTOs
// =============================================================================

/// Everything persisted by a successful login, written in one transaction.
#[derive(Debug, Clone)]
pub struct NewSessionCredentials {
    pub user_id: DbId,
    pub device: DeviceInfo,
    pub refresh_token: CreateRefreshToken,
    pub access_token: CreateAccessToken,
}

/// Rows created by [`SessionStore::create_session`].
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session: Session,
    pub refresh_token: RefreshToken,
    pub access_token: AccessToken,
}

/// A requested chain-head transition.
#[derive(Debug, Clone)]
pub struct Rotation {
    /// Head being replaced. Revoked only if still unrevoked.
    pub current_token_id: DbId,
    pub session_id: DbId,
    /// New head; `previous_token_id` must equal `current_token_id`.
    pub next_refresh_token: CreateRefreshToken,
    pub next_access_token: CreateAccessToken,
}

/// Result of the compare-and-set in [`SessionStore::rotate_refresh_token`].
#[derive(Debug, Clone)]
pub enum RotationOutcome {
    /// This caller won; the new head and its access token are committed.
    Rotated {
        refresh_token: RefreshToken,
        access_token: AccessToken,
    },
    /// The current head was already revoked when the update ran. Nothing
    /// was written.
    AlreadyRevoked,
}

/// Row counts removed by [`SessionStore::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub refresh_tokens: u64,
    pub sessions: u64,
}

// =============================================================================
// Traits
// =============================================================================

/// Durable record of sessions and their token chains.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create an `active` session, its head refresh token and the first
    /// access token atomically.
    async fn create_session(
        &self,
        input: NewSessionCredentials,
    ) -> Result<IssuedSession, StoreError>;

    /// Fetch a refresh token by digest together with its session state.
    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Atomically revoke the current head (only if unrevoked), insert the
    /// new head and its access token, and touch `last_accessed_at`.
    async fn rotate_refresh_token(&self, rotation: Rotation)
        -> Result<RotationOutcome, StoreError>;

    /// Revoke every token of `family` and move the session to `revoked`
    /// if it is still active. Returns the count of newly revoked tokens.
    async fn revoke_family(&self, family: TokenFamily, session_id: DbId)
        -> Result<u64, StoreError>;

    /// Revoke every token of a session and move it to `status` if it is
    /// still active. Returns `true` when the session changed status.
    async fn end_session(&self, session_id: DbId, status: SessionStatus)
        -> Result<bool, StoreError>;

    /// Fetch a session by id.
    async fn find_session(&self, session_id: DbId) -> Result<Option<Session>, StoreError>;

    /// Resolve the session that owns an access token digest.
    async fn find_session_id_by_access_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<DbId>, StoreError>;

    /// Every refresh token of a session, oldest first.
    async fn list_refresh_tokens(&self, session_id: DbId)
        -> Result<Vec<RefreshToken>, StoreError>;

    /// Delete tokens that expired before `cutoff`, then every session idle
    /// since before `cutoff` that is left with no tokens.
    async fn purge_expired(&self, cutoff: Timestamp) -> Result<PurgeStats, StoreError>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Identity lookups backing login and registration.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by email or username, preferring the email match.
    async fn find_user_by_identifier(&self, identifier: &str)
        -> Result<Option<User>, StoreError>;

    /// Find a user by id.
    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;

    /// Insert a user. Duplicate username, email or phone number fail with
    /// [`StoreError::Conflict`] naming the violated index.
    async fn create_user(&self, input: CreateUser) -> Result<User, StoreError>;
}
