//! PostgreSQL implementation of the storage traits.

use async_trait::async_trait;
use centralauth_core::session::SessionStatus;
use centralauth_core::types::{DbId, Timestamp, TokenFamily};

use crate::models::refresh_token::{RefreshToken, RefreshTokenRecord};
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, User};
use crate::repositories::{AccessTokenRepo, RefreshTokenRepo, SessionRepo, UserRepo};
use crate::store::{
    IssuedSession, NewSessionCredentials, PurgeStats, Rotation, RotationOutcome, SessionStore,
    StoreError, UserStore,
};
use crate::DbPool;

/// Transactional store over a shared connection pool.
///
/// Dropping a transaction without committing rolls it back, so an
/// operation cancelled mid-flight leaves no partial writes behind.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(
        &self,
        input: NewSessionCredentials,
    ) -> Result<IssuedSession, StoreError> {
        let mut tx = self.pool.begin().await?;

        let session = SessionRepo::create(
            &mut *tx,
            &CreateSession {
                user_id: input.user_id,
                device: input.device,
            },
        )
        .await?;
        let refresh_token =
            RefreshTokenRepo::create(&mut *tx, session.id, &input.refresh_token).await?;
        let access_token =
            AccessTokenRepo::create(&mut *tx, refresh_token.id, &input.access_token).await?;

        tx.commit().await?;
        Ok(IssuedSession {
            session,
            refresh_token,
            access_token,
        })
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(RefreshTokenRepo::find_record_by_hash(&self.pool, token_hash).await?)
    }

    async fn rotate_refresh_token(
        &self,
        rotation: Rotation,
    ) -> Result<RotationOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        SessionRepo::lock_for_update(&mut *tx, rotation.session_id).await?;

        if !RefreshTokenRepo::revoke_if_unrevoked(&mut *tx, rotation.current_token_id).await? {
            tracing::debug!(
                token_id = rotation.current_token_id,
                "Refresh token already revoked at rotation time"
            );
            tx.rollback().await?;
            return Ok(RotationOutcome::AlreadyRevoked);
        }

        let refresh_token =
            RefreshTokenRepo::create(&mut *tx, rotation.session_id, &rotation.next_refresh_token)
                .await?;
        let access_token =
            AccessTokenRepo::create(&mut *tx, refresh_token.id, &rotation.next_access_token)
                .await?;
        SessionRepo::touch(&mut *tx, rotation.session_id).await?;

        tx.commit().await?;
        Ok(RotationOutcome::Rotated {
            refresh_token,
            access_token,
        })
    }

    async fn revoke_family(
        &self,
        family: TokenFamily,
        session_id: DbId,
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        SessionRepo::lock_for_update(&mut *tx, session_id).await?;
        let revoked = RefreshTokenRepo::revoke_family(&mut *tx, family).await?;
        SessionRepo::end_if_active(&mut *tx, session_id, SessionStatus::Revoked).await?;
        tx.commit().await?;
        Ok(revoked)
    }

    async fn end_session(
        &self,
        session_id: DbId,
        status: SessionStatus,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        SessionRepo::lock_for_update(&mut *tx, session_id).await?;
        RefreshTokenRepo::revoke_all_for_session(&mut *tx, session_id).await?;
        let ended = SessionRepo::end_if_active(&mut *tx, session_id, status).await?;
        tx.commit().await?;
        Ok(ended)
    }

    async fn find_session(&self, session_id: DbId) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::find_by_id(&self.pool, session_id).await?)
    }

    async fn find_session_id_by_access_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<DbId>, StoreError> {
        Ok(AccessTokenRepo::find_session_id_by_hash(&self.pool, token_hash).await?)
    }

    async fn list_refresh_tokens(
        &self,
        session_id: DbId,
    ) -> Result<Vec<RefreshToken>, StoreError> {
        Ok(RefreshTokenRepo::list_for_session(&self.pool, session_id).await?)
    }

    async fn purge_expired(&self, cutoff: Timestamp) -> Result<PurgeStats, StoreError> {
        let mut tx = self.pool.begin().await?;
        let refresh_tokens = RefreshTokenRepo::purge_expired(&mut *tx, cutoff).await?;
        let sessions = SessionRepo::purge_orphaned(&mut *tx, cutoff).await?;
        tx.commit().await?;
        tracing::debug!(refresh_tokens, sessions, %cutoff, "Purged expired session rows");
        Ok(PurgeStats {
            refresh_tokens,
            sessions,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_identifier(&self.pool, identifier).await?)
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn create_user(&self, input: CreateUser) -> Result<User, StoreError> {
        Ok(UserRepo::create(&self.pool, &input).await?)
    }
}
