//! Wires an [`AppConfig`] into the session, ledger and advisory components.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::advisory::AdvisoryClient;
use crate::config::{AppConfig, ConfigManager};
use crate::errors::ConfigError;
use crate::ledger::LedgerStore;
use crate::session::{AuthProvider, IdentityToolkitProvider, SessionManager};
use crate::storage::DocumentStore;

const AUTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// The three components of a running client, built from one configuration.
pub struct App {
    pub session: Arc<SessionManager>,
    pub ledger: Arc<LedgerStore>,
    pub advisory: AdvisoryClient,
    offline: bool,
}

impl App {
    /// Without a store connection in `config` the app runs offline: no auth
    /// provider, and `documents` is ignored so every identity gets local data.
    pub fn from_config(config: &AppConfig, documents: Option<Arc<dyn DocumentStore>>) -> Self {
        let (provider, documents) = match &config.store {
            Some(connection) => {
                let provider: Arc<dyn AuthProvider> = Arc::new(
                    IdentityToolkitProvider::from_connection(connection, AUTH_REQUEST_TIMEOUT),
                );
                if documents.is_none() {
                    tracing::warn!("no document store supplied; signed-in users get local data");
                }
                (Some(provider), documents)
            }
            None => {
                tracing::info!("no store connection configured; running offline");
                (None, None)
            }
        };
        Self {
            session: Arc::new(SessionManager::new(provider)),
            ledger: Arc::new(LedgerStore::new(documents, config.ledger.clone())),
            advisory: AdvisoryClient::from_config(&config.advisory),
            offline: config.is_offline(),
        }
    }

    /// Reads `manager`'s file, overlays the environment and builds the app.
    pub fn load(
        manager: &ConfigManager,
        documents: Option<Arc<dyn DocumentStore>>,
    ) -> Result<Self, ConfigError> {
        let config = manager.resolve()?;
        tracing::debug!(
            path = %manager.path().display(),
            offline = config.is_offline(),
            "configuration resolved"
        );
        Ok(Self::from_config(&config, documents))
    }

    /// [`load`](Self::load) from the per-user config file.
    pub fn load_default(documents: Option<Arc<dyn DocumentStore>>) -> Result<Self, ConfigError> {
        Self::load(&ConfigManager::default_location(), documents)
    }

    /// Defaults overlaid with the process environment only.
    pub fn from_env(documents: Option<Arc<dyn DocumentStore>>) -> Self {
        Self::from_config(&AppConfig::from_env(), documents)
    }

    /// Starts the session feed and makes the ledger follow it.
    /// Must run inside a Tokio runtime.
    pub fn start(&self) -> JoinHandle<()> {
        self.session.start();
        self.ledger.follow(self.session.current_identity())
    }

    /// True when no store connection was configured.
    pub fn is_offline(&self) -> bool {
        self.offline
    }
}
