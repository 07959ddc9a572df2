//! Credential store kept in process memory, for local runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use super::provider::{AuthProvider, AuthStateFeed};
use crate::domain::Identity;
use crate::errors::AuthError;

const MIN_PASSWORD_LEN: usize = 6;

struct StoredUser {
    uid: String,
    email: String,
    password: String,
}

pub struct InMemoryAuthProvider {
    users: Mutex<HashMap<String, StoredUser>>,
    state: watch::Sender<Option<Identity>>,
    offline: AtomicBool,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(None);
        Self {
            users: Mutex::new(HashMap::new()),
            state,
            offline: AtomicBool::new(false),
        }
    }

    /// Registers a user up front and returns its uid.
    pub fn register(&self, email: &str, password: &str) -> String {
        let uid = Uuid::new_v4().to_string();
        self.users().insert(
            email.to_ascii_lowercase(),
            StoredUser {
                uid: uid.clone(),
                email: email.to_string(),
                password: password.to_string(),
            },
        );
        uid
    }

    /// Pretends a session survived from an earlier run.
    pub fn restore_session(&self, identity: Identity) {
        self.state.send_replace(Some(identity));
    }

    /// While offline every call fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn users(&self) -> MutexGuard<'_, HashMap<String, StoredUser>> {
        self.users
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(AuthError::Network("provider unreachable".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.ensure_online()?;
        let identity = {
            let users = self.users();
            let user = users
                .get(&email.to_ascii_lowercase())
                .filter(|user| user.password == password)
                .ok_or(AuthError::InvalidCredentials)?;
            Identity::authenticated(user.uid.clone(), user.email.clone())
        };
        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.ensure_online()?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(format!(
                "at least {MIN_PASSWORD_LEN} characters required"
            )));
        }
        if self.users().contains_key(&email.to_ascii_lowercase()) {
            return Err(AuthError::EmailInUse);
        }
        let uid = self.register(email, password);
        let identity = Identity::authenticated(uid, email);
        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.state.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> AuthStateFeed {
        AuthStateFeed::new(self.state.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_checks_password() {
        let provider = InMemoryAuthProvider::new();
        let uid = provider.register("Mei@Example.com", "secret1");
        let identity = provider.sign_in("mei@example.com", "secret1").await.unwrap();
        assert_eq!(identity.uid, uid);
        assert_eq!(
            provider.sign_in("mei@example.com", "nope").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn sign_up_enforces_unique_email_and_length() {
        let provider = InMemoryAuthProvider::new();
        provider.sign_up("a@b.co", "longenough").await.unwrap();
        assert_eq!(
            provider.sign_up("A@B.co", "longenough").await.unwrap_err(),
            AuthError::EmailInUse
        );
        assert!(matches!(
            provider.sign_up("c@d.co", "123").await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn feed_starts_with_current_state() {
        let provider = InMemoryAuthProvider::new();
        provider.restore_session(Identity::authenticated("u1", "u1@example.com"));
        let mut feed = provider.subscribe();
        let first = feed.next().await.unwrap();
        assert_eq!(first.map(|identity| identity.uid), Some("u1".to_string()));
        provider.sign_out().await.unwrap();
        assert_eq!(feed.next().await, Some(None));
    }

    #[tokio::test]
    async fn offline_provider_reports_network_errors() {
        let provider = InMemoryAuthProvider::new();
        provider.register("a@b.co", "secret1");
        provider.set_offline(true);
        assert!(matches!(
            provider.sign_in("a@b.co", "secret1").await,
            Err(AuthError::Network(_))
        ));
    }
}
