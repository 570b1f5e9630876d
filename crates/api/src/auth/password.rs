//! Argon2id password hashing and comparison.
//!
//! Hashes are stored in PHC string format, which embeds the algorithm,
//! parameters and salt alongside the digest.

use std::sync::LazyLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash of a throwaway password, compared against when a login names an
/// unknown account so both paths cost one Argon2 verification.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hash_password("centralauth-dummy-password").expect("hashing a constant must succeed")
});

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Compare a plaintext password with a stored PHC hash.
///
/// A hash that cannot be parsed never matches; the condition is logged
/// because it points at corrupt user data.
pub fn compare_password_hash(hash: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is not a valid PHC string");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Burn one verification against [`DUMMY_HASH`]. Always returns `false`.
pub fn compare_against_dummy(password: &str) -> bool {
    let _ = compare_password_hash(&DUMMY_HASH, password);
    false
}
