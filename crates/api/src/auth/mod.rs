//! Session and credential lifecycle engine.
//!
//! - [`jwt`] -- [`TokenCodec`](jwt::TokenCodec): HS256 access-token signing and verification.
//! - [`password`] -- Argon2id password hashing and comparison.
//! - [`credentials`] -- [`CredentialIssuer`](credentials::CredentialIssuer): mints token pairs
//!   and persists a new session.
//! - [`rotation`] -- [`RefreshRotationEngine`](rotation::RefreshRotationEngine): refresh-token
//!   rotation with reuse detection.
//! - [`revocation`] -- [`RevocationCascade`](revocation::RevocationCascade): logout and
//!   security revocation.
//! - [`lifecycle`] -- [`SessionLifecycle`](lifecycle::SessionLifecycle): the login / refresh /
//!   logout facade handlers call.
//! - [`error`] -- [`AuthError`](error::AuthError), the engine's failure taxonomy.

pub mod credentials;
pub mod error;
pub mod jwt;
pub mod lifecycle;
pub mod password;
pub mod revocation;
pub mod rotation;
