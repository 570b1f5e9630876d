//! Refresh-token rotation with reuse detection.
//!
//! Each refresh consumes the presented token and replaces it with a new
//! chain head in the same family. Presenting a consumed token again is
//! treated as theft: the whole family and its session are revoked.
//!
//! The only concurrency control is the store's compare-and-set on the
//! `revoked` flag. When two requests race with the same token, exactly one
//! wins the update; the loser takes the replay path.

use std::sync::Arc;

use centralauth_core::session::has_expired;
use centralauth_core::tokens::hash_token;
use centralauth_db::models::refresh_token::RefreshTokenRecord;
use centralauth_db::store::{Rotation, RotationOutcome};
use centralauth_db::{SessionStore, UserStore};
use chrono::Utc;

use super::credentials::{CredentialIssuer, IssuedCredentials};
use super::error::{AuthError, AuthResult};
use super::revocation::RevocationCascade;

pub struct RefreshRotationEngine {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    issuer: Arc<CredentialIssuer>,
    cascade: RevocationCascade,
}

impl RefreshRotationEngine {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        issuer: Arc<CredentialIssuer>,
        cascade: RevocationCascade,
    ) -> Self {
        Self {
            sessions,
            users,
            issuer,
            cascade,
        }
    }

    /// Exchange a refresh-token value for a new access token and a new
    /// refresh-token value.
    ///
    /// Checks run in a fixed order: unknown value, expiry, session state,
    /// then replay. The first three leave all state untouched.
    pub async fn rotate(&self, refresh_token: &str) -> AuthResult<IssuedCredentials> {
        let record = self
            .sessions
            .find_refresh_token(&hash_token(refresh_token))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let now = Utc::now();
        if has_expired(record.token.expires_at, now) {
            return Err(AuthError::TokenExpired);
        }
        if !record.session_status.is_active() {
            return Err(AuthError::SessionInvalid);
        }
        if record.token.revoked {
            return Err(self.reject_reuse(&record, "replayed").await);
        }

        let user = match self.users.find_user_by_id(record.user_id).await? {
            Some(user) if user.is_active => user,
            _ => return Err(AuthError::SessionInvalid),
        };

        let next_refresh =
            self.issuer
                .mint_refresh(record.token.token_family, Some(record.token.id), now);
        let next_access = self
            .issuer
            .mint_access(&user, now, next_refresh.row.expires_at)?;

        let outcome = self
            .sessions
            .rotate_refresh_token(Rotation {
                current_token_id: record.token.id,
                session_id: record.token.session_id,
                next_refresh_token: next_refresh.row,
                next_access_token: next_access.row,
            })
            .await?;

        match outcome {
            RotationOutcome::Rotated {
                refresh_token,
                access_token,
            } => {
                tracing::debug!(
                    session_id = record.token.session_id,
                    previous_token_id = record.token.id,
                    token_id = refresh_token.id,
                    "Refresh token rotated"
                );
                Ok(IssuedCredentials {
                    access_token: next_access.token,
                    access_expires_at: access_token.expires_at,
                    refresh_token: next_refresh.token,
                    refresh_expires_at: refresh_token.expires_at,
                    session_id: record.token.session_id,
                    user_id: user.id,
                })
            }
            RotationOutcome::AlreadyRevoked => Err(self.reject_reuse(&record, "lost race").await),
        }
    }

    /// Revoke the token's family and session, then report `TokenReused`.
    ///
    /// If the cascade itself fails, that storage error is returned instead:
    /// the caller must never see `TokenReused` without the revocation.
    async fn reject_reuse(&self, record: &RefreshTokenRecord, reason: &'static str) -> AuthError {
        tracing::warn!(
            session_id = record.token.session_id,
            user_id = record.user_id,
            token_id = record.token.id,
            token_family = %record.token.token_family,
            reason,
            "Refresh token reuse detected"
        );
        match self
            .cascade
            .revoke_family(record.token.token_family, record.token.session_id)
            .await
        {
            Ok(_) => AuthError::TokenReused,
            Err(e) => e,
        }
    }
}
