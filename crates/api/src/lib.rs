//! CentralAuth API server library.
//!
//! Exposes the session engine, configuration, state, error handling and
//! routes so integration tests and the binary entrypoint share them.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
