//! Login, refresh and logout: the engine's surface for request handlers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use centralauth_core::tokens::hash_token;
use centralauth_core::types::DbId;
use centralauth_db::models::session::DeviceInfo;
use centralauth_db::{SessionStore, UserStore};

use super::credentials::{CredentialIssuer, IssuedCredentials};
use super::error::{AuthError, AuthResult};
use super::jwt::TokenCodec;
use super::password::{compare_against_dummy, compare_password_hash};
use super::revocation::RevocationCascade;
use super::rotation::RefreshRotationEngine;

/// Default upper bound on one engine operation, store round trips included.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// A credential presented to end a session.
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    /// A signed access token. Its signature and expiry are verified first.
    Access(&'a str),
    /// An opaque refresh-token value.
    Refresh(&'a str),
}

/// Orchestrates the engine components for the three boundary operations.
///
/// Each operation runs under `operation_timeout`. When the deadline passes,
/// the in-flight future is dropped, which rolls back any open store
/// transaction, and the call fails with [`AuthError::StorageTimeout`].
pub struct SessionLifecycle {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    issuer: Arc<CredentialIssuer>,
    engine: RefreshRotationEngine,
    cascade: RevocationCascade,
    operation_timeout: Duration,
}

impl SessionLifecycle {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        issuer: Arc<CredentialIssuer>,
        operation_timeout: Duration,
    ) -> Self {
        let cascade = RevocationCascade::new(Arc::clone(&sessions));
        let engine = RefreshRotationEngine::new(
            Arc::clone(&sessions),
            Arc::clone(&users),
            Arc::clone(&issuer),
            cascade.clone(),
        );
        Self {
            users,
            sessions,
            issuer,
            engine,
            cascade,
            operation_timeout,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        self.issuer.codec()
    }

    pub fn cascade(&self) -> &RevocationCascade {
        &self.cascade
    }

    /// Authenticate by username or email and open a new session.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        device: DeviceInfo,
    ) -> AuthResult<IssuedCredentials> {
        self.with_deadline(async {
            let user = self.users.find_user_by_identifier(identifier).await?;
            let user = match user {
                Some(user) if compare_password_hash(&user.password_hash, password) => user,
                Some(_) => return Err(AuthError::InvalidCredentials),
                None => {
                    compare_against_dummy(password);
                    return Err(AuthError::InvalidCredentials);
                }
            };
            if !user.is_active {
                tracing::info!(user_id = user.id, "Login rejected for inactive account");
                return Err(AuthError::InvalidCredentials);
            }

            let issued = self
                .issuer
                .issue_session_credentials(self.sessions.as_ref(), &user, device)
                .await?;
            tracing::info!(user_id = user.id, session_id = issued.session_id, "User logged in");
            Ok(issued)
        })
        .await
    }

    /// Rotate a refresh token. See [`RefreshRotationEngine::rotate`].
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<IssuedCredentials> {
        self.with_deadline(self.engine.rotate(refresh_token)).await
    }

    /// End the session owning `credential`. Returns the session id.
    ///
    /// Logging out an already ended session succeeds without changes.
    pub async fn logout(&self, credential: Credential<'_>) -> AuthResult<DbId> {
        self.with_deadline(async {
            let session_id = self.resolve_session(credential).await?;
            self.cascade.logout(session_id).await?;
            Ok(session_id)
        })
        .await
    }

    async fn resolve_session(&self, credential: Credential<'_>) -> AuthResult<DbId> {
        match credential {
            Credential::Access(token) => {
                self.codec().verify(token)?;
                self.sessions
                    .find_session_id_by_access_token(&hash_token(token))
                    .await?
                    .ok_or(AuthError::InvalidToken)
            }
            Credential::Refresh(token) => self
                .sessions
                .find_refresh_token(&hash_token(token))
                .await?
                .map(|record| record.token.session_id)
                .ok_or(AuthError::InvalidToken),
        }
    }

    async fn with_deadline<T>(&self, op: impl Future<Output = AuthResult<T>>) -> AuthResult<T> {
        match tokio::time::timeout(self.operation_timeout, op).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "Session operation timed out"
                );
                Err(AuthError::StorageTimeout)
            }
        }
    }
}
