//! Domain primitives shared by the storage layer and the HTTP service.
//!
//! Nothing in this crate performs I/O: it holds identifiers, the session
//! status machine, token generation/hashing helpers, user-agent parsing and
//! input validation.

pub mod device;
pub mod error;
pub mod session;
pub mod tokens;
pub mod types;
pub mod validation;
