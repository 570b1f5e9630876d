//! Session status machine and expiry rule.
//!
//! A session starts `Active` and moves exactly once to either `LoggedOut`
//! (user-initiated) or `Revoked` (reuse detection). Both are terminal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    LoggedOut,
    Revoked,
}

impl SessionStatus {
    /// Value stored in the `sessions.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::LoggedOut => "logged_out",
            Self::Revoked => "revoked",
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Only `Active -> LoggedOut` and `Active -> Revoked` are allowed.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        self == Self::Active && next.is_terminal()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "logged_out" => Ok(Self::LoggedOut),
            "revoked" => Ok(Self::Revoked),
            other => Err(CoreError::Validation(format!(
                "unknown session status '{other}'"
            ))),
        }
    }
}

/// Lets row decoders map the text column directly onto the enum.
impl TryFrom<String> for SessionStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A credential is expired once `now` reaches its expiry instant.
pub fn has_expired(expires_at: Timestamp, now: Timestamp) -> bool {
    expires_at <= now
}
