use std::time::Duration;

use crate::auth::jwt::JwtConfig;
use crate::auth::lifecycle::DEFAULT_OPERATION_TIMEOUT;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Deadline for a single session engine operation (default: 5 s).
    pub store_timeout: Duration,
    /// Whether auth cookies carry the `Secure` attribute (default: `true`).
    pub secure_cookies: bool,
    /// How long expired tokens and idle tokenless sessions are kept before the
    /// retention job deletes them, in hours (default: `168`).
    pub session_retention_hours: i64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `3000`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                       |
    /// | `STORE_TIMEOUT_MS`        | `5000`                     |
    /// | `SECURE_COOKIES`          | `true`                     |
    /// | `SESSION_RETENTION_HOURS` | `168`                      |
    ///
    /// JWT variables are documented on [`JwtConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on unparseable values or an invalid JWT configuration.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let store_timeout = std::env::var("STORE_TIMEOUT_MS")
            .ok()
            .map(|v| {
                Duration::from_millis(v.parse().expect("STORE_TIMEOUT_MS must be a valid u64"))
            })
            .unwrap_or(DEFAULT_OPERATION_TIMEOUT);

        let secure_cookies = std::env::var("SECURE_COOKIES")
            .map(|v| parse_bool(&v).expect("SECURE_COOKIES must be true or false"))
            .unwrap_or(true);

        let session_retention_hours: i64 = std::env::var("SESSION_RETENTION_HOURS")
            .unwrap_or_else(|_| "168".into())
            .parse()
            .expect("SESSION_RETENTION_HOURS must be a valid i64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            store_timeout,
            secure_cookies,
            session_retention_hours,
            jwt,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
