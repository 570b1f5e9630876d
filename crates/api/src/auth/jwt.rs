//! Access-token claims, signing configuration and the HS256 codec.
//!
//! Access tokens are self-describing: the claims carry enough identity for a
//! resource server to authorize a call without a database round trip.

use centralauth_core::types::{DbId, Timestamp};
use centralauth_db::models::user::User;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    pub username: String,
    pub email: String,
    /// Display name (`first last`).
    pub name: String,
    pub email_verified: bool,
    pub phone_verified: bool,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token identifier (UUID v4). Keeps two tokens minted in the
    /// same second for the same user distinct.
    pub jti: String,
}

impl Claims {
    /// Build the claims for `user`, valid from `issued_at` until `expires_at`.
    pub fn for_user(user: &User, issued_at: Timestamp, expires_at: Timestamp) -> Self {
        Self {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.full_name(),
            email_verified: user.email_verified,
            phone_verified: user.phone_number_verified,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Configuration for token signing and lifetimes.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify access tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in minutes (default: 7 days).
    pub refresh_token_expiry_mins: i64,
}

const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
const DEFAULT_REFRESH_EXPIRY_MINS: i64 = 7 * 24 * 60;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default  |
    /// |----------------------------|----------|----------|
    /// | `JWT_SECRET`               | **yes**  | --       |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`     |
    /// | `JWT_REFRESH_EXPIRY_MINS`  | no       | `10080`  |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty, or if the lifetimes are not
    /// positive with the access lifetime strictly shorter than the refresh one.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_mins: i64 = std::env::var("JWT_REFRESH_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_MINS must be a valid i64");

        let config = Self {
            secret,
            access_token_expiry_mins,
            refresh_token_expiry_mins,
        };
        if let Err(msg) = config.validate() {
            panic!("Invalid JWT configuration: {msg}");
        }
        config
    }

    /// Check the invariants `from_env` enforces.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("JWT_SECRET must not be empty".into());
        }
        if self.access_token_expiry_mins <= 0 {
            return Err("JWT_ACCESS_EXPIRY_MINS must be positive".into());
        }
        if self.access_token_expiry_mins >= self.refresh_token_expiry_mins {
            return Err(format!(
                "access token lifetime ({} min) must be shorter than refresh token lifetime ({} min)",
                self.access_token_expiry_mins, self.refresh_token_expiry_mins
            ));
        }
        Ok(())
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_expiry_mins)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.refresh_token_expiry_mins)
    }
}

/// Failures of [`TokenCodec`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed")]
    Malformed,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Signs and verifies access tokens with a process-wide HS256 secret.
///
/// Keys are derived once at construction; the codec is immutable afterwards
/// and shared behind an `Arc`.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; no clock-skew grace.
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign `claims` into a compact JWT.
    pub fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}
