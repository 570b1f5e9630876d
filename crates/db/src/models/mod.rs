//! Row models and insert DTOs, one module per table.

pub mod access_token;
pub mod refresh_token;
pub mod session;
pub mod user;
