//! Opaque refresh-token generation and at-rest hashing.
//!
//! Refresh and access token values are handed to the client exactly once.
//! The store only ever sees their SHA-256 digest, so lookups always go
//! through [`hash_token`].

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::types::TokenFamily;

/// Random bytes per refresh token (256 bits of entropy).
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// A freshly generated refresh token.
pub struct GeneratedToken {
    /// Value returned to the client. Never persisted.
    pub plaintext: String,
    /// SHA-256 hex digest of `plaintext`, the persisted form.
    pub hash: String,
}

/// Generate a cryptographically random refresh token.
pub fn generate_refresh_token() -> GeneratedToken {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rng().fill(&mut bytes);

    let plaintext: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    let hash = hash_token(&plaintext);
    GeneratedToken { plaintext, hash }
}

/// SHA-256 hex digest of a token value.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{digest:x}")
}

/// Start a new token family (one per successful login).
pub fn new_token_family() -> TokenFamily {
    uuid::Uuid::new_v4()
}
