//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Methods accept any PostgreSQL executor, so the same query runs against
//! the pool or inside an open transaction (`&mut *tx`).

pub mod access_token_repo;
pub mod refresh_token_repo;
pub mod session_repo;
pub mod user_repo;

pub use access_token_repo::AccessTokenRepo;
pub use refresh_token_repo::RefreshTokenRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
