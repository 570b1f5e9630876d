/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifier shared by every refresh token descended from one login.
pub type TokenFamily = uuid::Uuid;
