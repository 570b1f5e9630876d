//! Minting of access/refresh token pairs.

use std::sync::Arc;

use centralauth_core::tokens::{generate_refresh_token, hash_token, new_token_family};
use centralauth_core::types::{DbId, Timestamp, TokenFamily};
use centralauth_db::models::access_token::CreateAccessToken;
use centralauth_db::models::refresh_token::CreateRefreshToken;
use centralauth_db::models::session::DeviceInfo;
use centralauth_db::models::user::User;
use centralauth_db::store::NewSessionCredentials;
use centralauth_db::SessionStore;
use chrono::{Duration, Utc};

use super::error::AuthResult;
use super::jwt::{Claims, JwtConfig, TokenCodec};

/// Token values handed to the client after login or refresh.
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub access_token: String,
    pub access_expires_at: Timestamp,
    pub refresh_token: String,
    pub refresh_expires_at: Timestamp,
    pub session_id: DbId,
    pub user_id: DbId,
}

/// A signed access token and the row that records it.
pub struct MintedAccess {
    pub token: String,
    pub row: CreateAccessToken,
}

/// A fresh refresh-token value and the row that records its digest.
pub struct MintedRefresh {
    pub token: String,
    pub row: CreateRefreshToken,
}

/// Mints credentials under a fixed expiry policy.
pub struct CredentialIssuer {
    codec: Arc<TokenCodec>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl CredentialIssuer {
    /// `access_ttl` must be shorter than `refresh_ttl`; [`JwtConfig::validate`]
    /// enforces this when configuration is loaded.
    pub fn new(codec: Arc<TokenCodec>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        debug_assert!(access_ttl < refresh_ttl);
        Self {
            codec,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(codec: Arc<TokenCodec>, config: &JwtConfig) -> Self {
        Self::new(codec, config.access_ttl(), config.refresh_ttl())
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Generate a new refresh value in `family`, expiring one refresh TTL
    /// after `now`.
    pub fn mint_refresh(
        &self,
        family: TokenFamily,
        previous_token_id: Option<DbId>,
        now: Timestamp,
    ) -> MintedRefresh {
        let generated = generate_refresh_token();
        MintedRefresh {
            token: generated.plaintext,
            row: CreateRefreshToken {
                token_hash: generated.hash,
                client_id: None,
                token_family: family,
                previous_token_id,
                expires_at: now + self.refresh_ttl,
            },
        }
    }

    /// Sign an access token for `user`. Its expiry never outlives
    /// `refresh_expires_at`, the owning refresh token's expiry.
    pub fn mint_access(
        &self,
        user: &User,
        now: Timestamp,
        refresh_expires_at: Timestamp,
    ) -> AuthResult<MintedAccess> {
        let expires_at = (now + self.access_ttl).min(refresh_expires_at);
        let token = self.codec.issue(&Claims::for_user(user, now, expires_at))?;
        Ok(MintedAccess {
            row: CreateAccessToken {
                token_hash: hash_token(&token),
                expires_at,
            },
            token,
        })
    }

    /// Mint a token pair for a fresh login and persist the new session,
    /// its head refresh token and the access token in one atomic write.
    pub async fn issue_session_credentials(
        &self,
        store: &dyn SessionStore,
        user: &User,
        device: DeviceInfo,
    ) -> AuthResult<IssuedCredentials> {
        let now = Utc::now();
        let refresh = self.mint_refresh(new_token_family(), None, now);
        let access = self.mint_access(user, now, refresh.row.expires_at)?;

        let issued = store
            .create_session(NewSessionCredentials {
                user_id: user.id,
                device,
                refresh_token: refresh.row,
                access_token: access.row,
            })
            .await?;

        Ok(IssuedCredentials {
            access_token: access.token,
            access_expires_at: issued.access_token.expires_at,
            refresh_token: refresh.token,
            refresh_expires_at: issued.refresh_token.expires_at,
            session_id: issued.session.id,
            user_id: user.id,
        })
    }
}
