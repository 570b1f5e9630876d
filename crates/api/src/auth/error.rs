//! Failure taxonomy of the session engine.

use centralauth_db::StoreError;

use super::jwt::TokenError;

/// Errors returned by the session engine.
///
/// The token variants are distinguished internally for logging and tests;
/// the HTTP layer collapses them into one generic 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown identifier, wrong password or disabled account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Unknown, malformed or wrongly signed token.
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    /// A rotated-away refresh token was presented again. The family has
    /// already been revoked when this is returned.
    #[error("refresh token reused")]
    TokenReused,

    /// The token's session is logged out or revoked.
    #[error("session is no longer active")]
    SessionInvalid,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The operation's deadline passed before the store answered.
    #[error("storage operation timed out")]
    StorageTimeout,

    #[error("signing error: {0}")]
    Signing(String),
}

impl AuthError {
    /// `true` for failures caused by the presented credential rather than
    /// by the service.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Storage(_) | Self::StorageTimeout | Self::Signing(_)
        )
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::InvalidSignature | TokenError::Malformed => Self::InvalidToken,
            TokenError::Signing(msg) => Self::Signing(msg),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
