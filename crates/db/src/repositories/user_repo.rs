//! Repository for the `users` table.

use centralauth_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::user::{CreateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, first_name, last_name, username, email, phone_number, \
                       password_hash, email_verified, phone_number_verified, is_active, \
                       created_at, updated_at";

/// Provides lookups and inserts for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    ///
    /// Duplicate username, email or phone number surface as a unique
    /// violation on the matching `uq_users_*` index.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateUser,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (first_name, last_name, username, email, phone_number, password_hash)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.phone_number)
            .bind(&input.password_hash)
            .fetch_one(executor)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a user whose email or username equals `identifier`.
    ///
    /// An email match wins over a username match, so a username shaped like
    /// someone else's email can never shadow that account.
    pub async fn find_by_identifier<'e, E: PgExecutor<'e>>(
        executor: E,
        identifier: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE username = $1 OR email = $1
             ORDER BY (email = $1) DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(identifier)
            .fetch_optional(executor)
            .await
    }
}
