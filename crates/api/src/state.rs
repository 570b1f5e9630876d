use std::sync::Arc;

use centralauth_db::{SessionStore, UserStore};

use crate::auth::credentials::CredentialIssuer;
use crate::auth::jwt::TokenCodec;
use crate::auth::lifecycle::SessionLifecycle;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Login / refresh / logout engine.
    pub lifecycle: Arc<SessionLifecycle>,
    /// Identity store, used directly by registration.
    pub users: Arc<dyn UserStore>,
    /// Session store, used directly by health checks and background jobs.
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Wire the engine over a store that backs both users and sessions.
    pub fn new<S>(config: ServerConfig, store: Arc<S>) -> Self
    where
        S: SessionStore + UserStore + 'static,
    {
        let codec = Arc::new(TokenCodec::new(&config.jwt.secret));
        let issuer = Arc::new(CredentialIssuer::from_config(codec, &config.jwt));
        let users: Arc<dyn UserStore> = store.clone();
        let sessions: Arc<dyn SessionStore> = store;
        let lifecycle = Arc::new(SessionLifecycle::new(
            Arc::clone(&users),
            Arc::clone(&sessions),
            issuer,
            config.store_timeout,
        ));

        Self {
            config: Arc::new(config),
            lifecycle,
            users,
            sessions,
        }
    }
}
