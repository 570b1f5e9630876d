//! In-process implementation of the storage traits.
//!
//! Each operation takes one lock for its whole duration, which gives the
//! same all-or-nothing visibility as a PostgreSQL transaction. Used by the
//! engine and HTTP tests, and handy for local runs without a database.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use centralauth_core::session::SessionStatus;
use centralauth_core::types::{DbId, Timestamp, TokenFamily};
use chrono::Utc;

use crate::models::access_token::{AccessToken, CreateAccessToken};
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken, RefreshTokenRecord};
use crate::models::session::Session;
use crate::models::user::{CreateUser, User};
use crate::store::{
    IssuedSession, NewSessionCredentials, PurgeStats, Rotation, RotationOutcome, SessionStore,
    StoreError, UserStore,
};

#[derive(Default)]
struct Tables {
    next_id: DbId,
    users: Vec<User>,
    sessions: Vec<Session>,
    refresh_tokens: Vec<RefreshToken>,
    access_tokens: Vec<AccessToken>,
}

impl Tables {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn session_mut(&mut self, id: DbId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Mirror the unique indexes on `refresh_tokens`. `replacing` is a head
    /// that the same operation revokes first.
    fn check_refresh_insert(
        &self,
        input: &CreateRefreshToken,
        replacing: Option<DbId>,
    ) -> Result<(), StoreError> {
        if self.refresh_tokens.iter().any(|t| t.token == input.token_hash) {
            return Err(StoreError::conflict("uq_refresh_tokens_token"));
        }
        if self.refresh_tokens.iter().any(|t| {
            t.token_family == input.token_family && !t.revoked && Some(t.id) != replacing
        }) {
            return Err(StoreError::conflict("uq_refresh_tokens_family_head"));
        }
        Ok(())
    }

    fn check_access_insert(&self, input: &CreateAccessToken) -> Result<(), StoreError> {
        if self.access_tokens.iter().any(|t| t.token == input.token_hash) {
            return Err(StoreError::conflict("uq_access_tokens_token"));
        }
        Ok(())
    }

    /// Callers run the `check_*` guards first so this cannot fail halfway.
    fn insert_refresh_token(
        &mut self,
        session_id: DbId,
        input: &CreateRefreshToken,
    ) -> RefreshToken {
        let token = RefreshToken {
            id: self.next_id(),
            session_id,
            token: input.token_hash.clone(),
            client_id: input.client_id.clone(),
            token_family: input.token_family,
            previous_token_id: input.previous_token_id,
            expires_at: input.expires_at,
            revoked: false,
            created_at: Utc::now(),
        };
        self.refresh_tokens.push(token.clone());
        token
    }

    fn insert_access_token(
        &mut self,
        refresh_token_id: DbId,
        input: &CreateAccessToken,
    ) -> AccessToken {
        let token = AccessToken {
            id: self.next_id(),
            refresh_token_id,
            token: input.token_hash.clone(),
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };
        self.access_tokens.push(token.clone());
        token
    }

    fn end_if_active(&mut self, session_id: DbId, status: SessionStatus) -> bool {
        match self.session_mut(session_id) {
            Some(session) if session.status.can_transition_to(status) => {
                session.status = status;
                session.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Revoke tokens matching `pred`, returning how many changed.
    fn revoke_where(&mut self, pred: impl Fn(&RefreshToken) -> bool) -> u64 {
        let mut revoked = 0;
        for token in self.refresh_tokens.iter_mut().filter(|t| !t.revoked && pred(t)) {
            token.revoked = true;
            revoked += 1;
        }
        revoked
    }
}

/// Mutex-guarded tables mirroring the PostgreSQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // Mutations validate before writing, so poisoned tables are still consistent.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a refresh token for an existing session directly, bypassing
    /// the chain-head checks of the engine. Lets tests plant expired or
    /// pre-revoked rows.
    pub fn insert_refresh_token(
        &self,
        session_id: DbId,
        input: &CreateRefreshToken,
    ) -> Result<RefreshToken, StoreError> {
        let mut tables = self.lock();
        if !tables.sessions.iter().any(|s| s.id == session_id) {
            return Err(StoreError::not_found(format!("session {session_id}")));
        }
        tables.check_refresh_insert(input, None)?;
        Ok(tables.insert_refresh_token(session_id, input))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        input: NewSessionCredentials,
    ) -> Result<IssuedSession, StoreError> {
        let mut tables = self.lock();
        if !tables.users.iter().any(|u| u.id == input.user_id) {
            return Err(StoreError::not_found(format!("user {}", input.user_id)));
        }
        tables.check_refresh_insert(&input.refresh_token, None)?;
        tables.check_access_insert(&input.access_token)?;

        let now = Utc::now();
        let session = Session {
            id: tables.next_id(),
            user_id: input.user_id,
            device_name: input.device.device_name,
            ip_address: input.device.ip_address,
            user_agent: input.device.user_agent,
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
        };
        tables.sessions.push(session.clone());
        let refresh_token = tables.insert_refresh_token(session.id, &input.refresh_token);
        let access_token = tables.insert_access_token(refresh_token.id, &input.access_token);

        Ok(IssuedSession {
            session,
            refresh_token,
            access_token,
        })
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let tables = self.lock();
        let Some(token) = tables.refresh_tokens.iter().find(|t| t.token == token_hash) else {
            return Ok(None);
        };
        let session = tables
            .sessions
            .iter()
            .find(|s| s.id == token.session_id)
            .ok_or_else(|| StoreError::not_found(format!("session {}", token.session_id)))?;
        Ok(Some(RefreshTokenRecord {
            token: token.clone(),
            user_id: session.user_id,
            session_status: session.status,
        }))
    }

    async fn rotate_refresh_token(
        &self,
        rotation: Rotation,
    ) -> Result<RotationOutcome, StoreError> {
        let mut tables = self.lock();

        let Some(current) = tables
            .refresh_tokens
            .iter()
            .find(|t| t.id == rotation.current_token_id)
        else {
            return Err(StoreError::not_found(format!(
                "refresh token {}",
                rotation.current_token_id
            )));
        };
        if current.revoked {
            return Ok(RotationOutcome::AlreadyRevoked);
        }
        tables.check_refresh_insert(
            &rotation.next_refresh_token,
            Some(rotation.current_token_id),
        )?;
        tables.check_access_insert(&rotation.next_access_token)?;

        tables.revoke_where(|t| t.id == rotation.current_token_id);
        let refresh_token =
            tables.insert_refresh_token(rotation.session_id, &rotation.next_refresh_token);
        let access_token =
            tables.insert_access_token(refresh_token.id, &rotation.next_access_token);
        if let Some(session) = tables.session_mut(rotation.session_id) {
            let now = Utc::now();
            session.last_accessed_at = now;
            session.updated_at = now;
        }

        Ok(RotationOutcome::Rotated {
            refresh_token,
            access_token,
        })
    }

    async fn revoke_family(
        &self,
        family: TokenFamily,
        session_id: DbId,
    ) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let revoked = tables.revoke_where(|t| t.token_family == family);
        tables.end_if_active(session_id, SessionStatus::Revoked);
        Ok(revoked)
    }

    async fn end_session(
        &self,
        session_id: DbId,
        status: SessionStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        tables.revoke_where(|t| t.session_id == session_id);
        Ok(tables.end_if_active(session_id, status))
    }

    async fn find_session(&self, session_id: DbId) -> Result<Option<Session>, StoreError> {
        Ok(self
            .lock()
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned())
    }

    async fn find_session_id_by_access_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<DbId>, StoreError> {
        let tables = self.lock();
        let session_id = tables
            .access_tokens
            .iter()
            .find(|a| a.token == token_hash)
            .and_then(|a| {
                tables
                    .refresh_tokens
                    .iter()
                    .find(|t| t.id == a.refresh_token_id)
            })
            .map(|t| t.session_id);
        Ok(session_id)
    }

    async fn list_refresh_tokens(
        &self,
        session_id: DbId,
    ) -> Result<Vec<RefreshToken>, StoreError> {
        Ok(self
            .lock()
            .refresh_tokens
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn purge_expired(&self, cutoff: Timestamp) -> Result<PurgeStats, StoreError> {
        let mut tables = self.lock();

        let purged: Vec<DbId> = tables
            .refresh_tokens
            .iter()
            .filter(|t| t.expires_at < cutoff)
            .map(|t| t.id)
            .collect();
        tables.refresh_tokens.retain(|t| !purged.contains(&t.id));
        let refresh_tokens = purged.len() as u64;

        let Tables {
            refresh_tokens: remaining,
            access_tokens,
            sessions,
            ..
        } = &mut *tables;
        access_tokens.retain(|a| remaining.iter().any(|t| t.id == a.refresh_token_id));
        for token in remaining.iter_mut() {
            if token.previous_token_id.is_some_and(|prev| purged.contains(&prev)) {
                token.previous_token_id = None;
            }
        }

        let before = sessions.len();
        sessions.retain(|s| {
            s.updated_at.max(s.last_accessed_at) >= cutoff
                || remaining.iter().any(|t| t.session_id == s.id)
        });
        let sessions = (before - sessions.len()) as u64;

        Ok(PurgeStats {
            refresh_tokens,
            sessions,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.lock();
        let by_email = tables.users.iter().find(|u| u.email == identifier);
        Ok(by_email
            .or_else(|| tables.users.iter().find(|u| u.username == identifier))
            .cloned())
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, input: CreateUser) -> Result<User, StoreError> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.username == input.username) {
            return Err(StoreError::conflict("uq_users_username"));
        }
        if tables.users.iter().any(|u| u.email == input.email) {
            return Err(StoreError::conflict("uq_users_email"));
        }
        if input.phone_number.is_some()
            && tables
                .users
                .iter()
                .any(|u| u.phone_number == input.phone_number)
        {
            return Err(StoreError::conflict("uq_users_phone_number"));
        }

        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            first_name: input.first_name,
            last_name: input.last_name,
            username: input.username,
            email: input.email,
            phone_number: input.phone_number,
            password_hash: input.password_hash,
            email_verified: false,
            phone_number_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use centralauth_core::tokens::new_token_family;
    use chrono::Duration;

    use super::*;
    use crate::models::session::DeviceInfo;

    fn new_user(username: &str, email: &str) -> CreateUser {
        CreateUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            username: username.into(),
            email: email.into(),
            phone_number: None,
            password_hash: "hash".into(),
        }
    }

    fn credentials(user_id: DbId, refresh: &str, access: &str) -> NewSessionCredentials {
        let now = Utc::now();
        NewSessionCredentials {
            user_id,
            device: DeviceInfo::default(),
            refresh_token: CreateRefreshToken {
                token_hash: refresh.into(),
                client_id: None,
                token_family: new_token_family(),
                previous_token_id: None,
                expires_at: now + Duration::days(7),
            },
            access_token: CreateAccessToken {
                token_hash: access.into(),
                expires_at: now + Duration::minutes(15),
            },
        }
    }

    fn rotation_from(current: &RefreshToken, refresh: &str, access: &str) -> Rotation {
        let now = Utc::now();
        Rotation {
            current_token_id: current.id,
            session_id: current.session_id,
            next_refresh_token: CreateRefreshToken {
                token_hash: refresh.into(),
                client_id: None,
                token_family: current.token_family,
                previous_token_id: Some(current.id),
                expires_at: now + Duration::days(7),
            },
            next_access_token: CreateAccessToken {
                token_hash: access.into(),
                expires_at: now + Duration::minutes(15),
            },
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.create_user(new_user("ada", "a@x.com")).await.unwrap();

        let err = store
            .create_user(new_user("other", "a@x.com"))
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::Conflict(ref c) if c == "uq_users_email");
    }

    #[tokio::test]
    async fn identifier_matches_username_or_email() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ada", "a@x.com")).await.unwrap();

        let by_name = store.find_user_by_identifier("ada").await.unwrap().unwrap();
        let by_email = store.find_user_by_identifier("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_email.id, user.id);
        assert!(store.find_user_by_identifier("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_rotation_of_the_same_head_loses() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ada", "a@x.com")).await.unwrap();
        let issued = store
            .create_session(credentials(user.id, "r0", "a0"))
            .await
            .unwrap();

        let first = store
            .rotate_refresh_token(rotation_from(&issued.refresh_token, "r1", "a1"))
            .await
            .unwrap();
        assert_matches!(first, RotationOutcome::Rotated { ref refresh_token, .. } => {
            assert_eq!(refresh_token.previous_token_id, Some(issued.refresh_token.id));
        });

        let second = store
            .rotate_refresh_token(rotation_from(&issued.refresh_token, "r2", "a2"))
            .await
            .unwrap();
        assert_matches!(second, RotationOutcome::AlreadyRevoked);

        // The losing attempt wrote nothing.
        let tokens = store.list_refresh_tokens(issued.session.id).await.unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(store.find_refresh_token("r2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_session_insert_leaves_no_rows() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ada", "a@x.com")).await.unwrap();
        store
            .create_session(credentials(user.id, "r0", "a0"))
            .await
            .unwrap();

        let err = store
            .create_session(credentials(user.id, "r1", "a0"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(store.find_refresh_token("r1").await.unwrap().is_none());
        assert_eq!(store.lock().sessions.len(), 1);
    }

    #[test]
    fn planting_a_token_requires_an_existing_session() {
        let store = MemoryStore::new();
        let input = credentials(1, "r0", "a0").refresh_token;

        let err = store.insert_refresh_token(42, &input).unwrap_err();
        assert!(err.is_not_found());
        assert!(store.lock().refresh_tokens.is_empty());
    }

    #[tokio::test]
    async fn end_session_keeps_first_terminal_status() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ada", "a@x.com")).await.unwrap();
        let issued = store
            .create_session(credentials(user.id, "r0", "a0"))
            .await
            .unwrap();
        let session_id = issued.session.id;

        assert!(store
            .revoke_family(issued.refresh_token.token_family, session_id)
            .await
            .map(|n| n == 1)
            .unwrap());
        assert!(!store
            .end_session(session_id, SessionStatus::LoggedOut)
            .await
            .unwrap());

        let session = store.find_session(session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Revoked);
    }

    #[tokio::test]
    async fn access_token_resolves_its_session() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ada", "a@x.com")).await.unwrap();
        let issued = store
            .create_session(credentials(user.id, "r0", "a0"))
            .await
            .unwrap();

        assert_eq!(
            store.find_session_id_by_access_token("a0").await.unwrap(),
            Some(issued.session.id)
        );
        assert_eq!(store.find_session_id_by_access_token("zz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn purge_removes_long_expired_tokens_and_empty_ended_sessions() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ada", "a@x.com")).await.unwrap();
        let issued = store
            .create_session(credentials(user.id, "r0", "a0"))
            .await
            .unwrap();
        store
            .end_session(issued.session.id, SessionStatus::LoggedOut)
            .await
            .unwrap();

        // Nothing has expired yet.
        let stats = store.purge_expired(Utc::now()).await.unwrap();
        assert_eq!(stats, PurgeStats::default());

        let stats = store
            .purge_expired(Utc::now() + Duration::days(8))
            .await
            .unwrap();
        assert_eq!(
            stats,
            PurgeStats {
                refresh_tokens: 1,
                sessions: 1
            }
        );
        assert!(store.find_session(issued.session.id).await.unwrap().is_none());
        assert_eq!(store.find_session_id_by_access_token("a0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn purge_removes_sessions_that_expired_without_logout() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ada", "a@x.com")).await.unwrap();
        let abandoned = store
            .create_session(credentials(user.id, "r0", "a0"))
            .await
            .unwrap();
        let mut fresh = credentials(user.id, "r1", "a1");
        fresh.refresh_token.expires_at = Utc::now() + Duration::days(30);
        let live = store.create_session(fresh).await.unwrap();

        let stats = store
            .purge_expired(Utc::now() + Duration::days(8))
            .await
            .unwrap();

        assert_eq!(
            stats,
            PurgeStats {
                refresh_tokens: 1,
                sessions: 1
            }
        );
        assert!(store.find_session(abandoned.session.id).await.unwrap().is_none());
        let live = store.find_session(live.session.id).await.unwrap().unwrap();
        assert_eq!(live.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn email_match_wins_over_username_match() {
        let store = MemoryStore::new();
        let squatter = store
            .create_user(new_user("victim@x.com", "squatter@x.com"))
            .await
            .unwrap();
        let victim = store
            .create_user(new_user("victim", "victim@x.com"))
            .await
            .unwrap();

        let found = store
            .find_user_by_identifier("victim@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, victim.id);

        let by_name = store.find_user_by_identifier("victim").await.unwrap().unwrap();
        assert_eq!(by_name.id, victim.id);
        assert_ne!(found.id, squatter.id);
    }
}
