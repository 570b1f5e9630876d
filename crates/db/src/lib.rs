//! Persistence for users, sessions and the refresh/access token chain.
//!
//! The engine talks to storage only through the [`store::SessionStore`] and
//! [`store::UserStore`] traits. [`pg_store::PgStore`] is the production
//! backend; [`memory_store::MemoryStore`] backs tests and local runs.

use sqlx::postgres::PgPoolOptions;

pub mod memory_store;
pub mod models;
pub mod pg_store;
pub mod repositories;
pub mod store;

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;
pub use store::{SessionStore, StoreError, UserStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
