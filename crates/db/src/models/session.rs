//! Session model and DTOs.

use centralauth_core::session::SessionStatus;
use centralauth_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub device_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: SessionStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub last_accessed_at: Timestamp,
}

/// Diagnostic details captured when a session is opened.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub device_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// DTO for creating a new session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub device: DeviceInfo,
}
