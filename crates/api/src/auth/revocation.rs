//! Session termination: user logout and security revocation.

use std::sync::Arc;

use centralauth_core::session::SessionStatus;
use centralauth_core::types::{DbId, TokenFamily};
use centralauth_db::SessionStore;

use super::error::AuthResult;

/// Ends sessions and revokes every refresh token chained to them.
///
/// Every call is one store transaction. A session that is already terminal
/// keeps its first terminal status, so repeating a call changes nothing.
#[derive(Clone)]
pub struct RevocationCascade {
    sessions: Arc<dyn SessionStore>,
}

impl RevocationCascade {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// User-initiated logout. Returns `true` if the session was active.
    pub async fn logout(&self, session_id: DbId) -> AuthResult<bool> {
        let ended = self
            .sessions
            .end_session(session_id, SessionStatus::LoggedOut)
            .await?;
        if ended {
            tracing::info!(session_id, "Session logged out");
        } else {
            tracing::debug!(session_id, "Logout on an already ended session");
        }
        Ok(ended)
    }

    /// Revoke a session for security reasons. Returns `true` if the
    /// session was active.
    pub async fn security_revoke(&self, session_id: DbId) -> AuthResult<bool> {
        let ended = self
            .sessions
            .end_session(session_id, SessionStatus::Revoked)
            .await?;
        if ended {
            tracing::warn!(session_id, "Session revoked");
        }
        Ok(ended)
    }

    /// Kill a whole token family and its session. Used when a refresh
    /// token is replayed.
    pub async fn revoke_family(&self, family: TokenFamily, session_id: DbId) -> AuthResult<u64> {
        let revoked = self.sessions.revoke_family(family, session_id).await?;
        tracing::warn!(
            session_id,
            token_family = %family,
            revoked,
            "Token family revoked"
        );
        Ok(revoked)
    }
}
