use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::Identity;
use crate::errors::AuthError;

/// Auth-state changes pushed by a provider. Dropping it unsubscribes.
pub struct AuthStateFeed {
    rx: watch::Receiver<Option<Identity>>,
    started: bool,
}

impl AuthStateFeed {
    pub fn new(rx: watch::Receiver<Option<Identity>>) -> Self {
        Self { rx, started: false }
    }

    /// The current state on first call, then one value per change.
    /// `None` once the provider is gone.
    pub async fn next(&mut self) -> Option<Option<Identity>> {
        if !self.started {
            self.started = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// External authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Starts with the provider's resolution of any existing session.
    fn subscribe(&self) -> AuthStateFeed;
}
