//! Session Manager: who is signed in, and how that changes.
//!
//! The current identity lives in a `watch` channel. Sign-in and sign-up go
//! through an [`AuthProvider`]; demo mode never leaves the process.

pub mod identity_toolkit;
pub mod memory;
pub mod provider;

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::Stream;

use crate::domain::Identity;
use crate::errors::AuthError;

pub use identity_toolkit::IdentityToolkitProvider;
pub use memory::InMemoryAuthProvider;
pub use provider::{AuthProvider, AuthStateFeed};

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Push-based view of the current identity: yields the value at subscription
/// time, then every change.
pub struct IdentityFeed {
    inner: WatchStream<Option<Identity>>,
}

impl IdentityFeed {
    fn new(rx: watch::Receiver<Option<Identity>>) -> Self {
        Self {
            inner: WatchStream::new(rx),
        }
    }
}

impl Stream for IdentityFeed {
    type Item = Option<Identity>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

pub struct SessionManager {
    provider: Option<Arc<dyn AuthProvider>>,
    state: Arc<watch::Sender<Option<Identity>>>,
    last_error: Mutex<Option<AuthError>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// `provider` is `None` when running offline; only demo mode works then.
    pub fn new(provider: Option<Arc<dyn AuthProvider>>) -> Self {
        let (state, _rx) = watch::channel(None);
        Self {
            provider,
            state: Arc::new(state),
            last_error: Mutex::new(None),
            listener: Mutex::new(None),
        }
    }

    fn listener(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn last_error(&self) -> MutexGuard<'_, Option<AuthError>> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts forwarding the provider's auth-state feed. Calling it again
    /// while the listener runs does nothing. Must run inside a Tokio runtime.
    pub fn start(&self) {
        let Some(provider) = self.provider.clone() else {
            tracing::debug!("no auth provider configured; session feed not started");
            return;
        };
        let mut listener = self.listener();
        if listener.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let mut feed = provider.subscribe();
        let state = Arc::clone(&self.state);
        *listener = Some(tokio::spawn(async move {
            while let Some(event) = feed.next().await {
                forward(&state, event);
            }
            tracing::debug!("auth provider feed ended");
        }));
    }

    /// Tears down the provider subscription.
    pub fn stop(&self) {
        if let Some(handle) = self.listener().take() {
            handle.abort();
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.authenticate(email, password, false).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.authenticate(email, password, true).await
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
        create: bool,
    ) -> Result<Identity, AuthError> {
        self.last_error().take();
        let result = self.attempt(email.trim(), password, create).await;
        match &result {
            Ok(identity) => {
                tracing::info!(uid = %identity.uid, sign_up = create, "signed in");
                self.state.send_replace(Some(identity.clone()));
            }
            Err(err) => {
                tracing::warn!(error = %err, sign_up = create, "authentication failed");
                *self.last_error() = Some(err.clone());
            }
        }
        result
    }

    async fn attempt(
        &self,
        email: &str,
        password: &str,
        create: bool,
    ) -> Result<Identity, AuthError> {
        validate_credentials(email, password)?;
        let provider = self.provider.as_ref().ok_or(AuthError::Unavailable)?;
        if create {
            provider.sign_up(email, password).await
        } else {
            provider.sign_in(email, password).await
        }
    }

    /// Switches to the synthetic guest identity. Never touches the network.
    pub fn enter_demo_mode(&self) -> Identity {
        let guest = Identity::guest();
        self.state.send_replace(Some(guest.clone()));
        tracing::info!("entered demo mode");
        guest
    }

    /// Clears the current identity. A provider failure is logged and the
    /// local identity is cleared anyway.
    pub async fn sign_out(&self) {
        let current = self.current();
        if matches!(&current, Some(identity) if !identity.is_guest()) {
            if let Some(provider) = &self.provider {
                if let Err(err) = provider.sign_out().await {
                    tracing::warn!(error = %err, "provider sign-out failed; clearing session locally");
                }
            }
        }
        self.state.send_if_modified(|state| state.take().is_some());
        if current.is_some() {
            tracing::info!("signed out");
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    pub fn current_identity(&self) -> IdentityFeed {
        IdentityFeed::new(self.state.subscribe())
    }

    /// The last authentication error. Reading it clears it.
    pub fn take_error(&self) -> Option<AuthError> {
        self.last_error().take()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Applies one provider event. `None` never clears a guest identity.
fn forward(state: &watch::Sender<Option<Identity>>, event: Option<Identity>) {
    state.send_if_modified(|current| {
        let keep_guest = event.is_none() && current.as_ref().is_some_and(Identity::is_guest);
        if keep_guest || *current == event {
            return false;
        }
        *current = event;
        true
    });
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if !EMAIL_SHAPE.is_match(email) {
        return Err(AuthError::MalformedEmail(email.to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::MissingPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_is_checked_before_password() {
        assert_eq!(
            validate_credentials("not-an-email", ""),
            Err(AuthError::MalformedEmail("not-an-email".into()))
        );
        assert_eq!(
            validate_credentials("a@b.co", ""),
            Err(AuthError::MissingPassword)
        );
        assert!(validate_credentials("a@b.co", "secret").is_ok());
        assert!(validate_credentials("a b@c.d", "x").is_err());
    }

    #[test]
    fn provider_none_keeps_guest_but_clears_authenticated() {
        let (state, _rx) = watch::channel(Some(Identity::guest()));
        forward(&state, None);
        assert_eq!(*state.borrow(), Some(Identity::guest()));

        let user = Identity::authenticated("u1", "a@b.co");
        forward(&state, Some(user.clone()));
        assert_eq!(*state.borrow(), Some(user));
        forward(&state, None);
        assert_eq!(*state.borrow(), None);
    }

    #[tokio::test]
    async fn offline_manager_reports_unavailable_and_records_error() {
        let manager = SessionManager::new(None);
        let err = manager.sign_in("a@b.co", "secret").await.unwrap_err();
        assert_eq!(err, AuthError::Unavailable);
        assert_eq!(manager.take_error(), Some(AuthError::Unavailable));
        assert_eq!(manager.take_error(), None);
        assert_eq!(manager.current(), None);
    }
}
