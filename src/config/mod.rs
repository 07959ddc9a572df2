//! Application configuration: one explicit object built at startup and passed
//! to the session, ledger and advisory constructors.

use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::errors::ConfigError;
use crate::utils::present_secret;

const TMP_SUFFIX: &str = "tmp";
const CONFIG_DIR_NAME: &str = "smart_finance";
const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable carrying the document store connection as JSON.
pub const STORE_CONFIG_ENV: &str = "FIREBASE_CONFIG";
/// Environment variables checked, in order, for the generative endpoint key.
pub const API_KEY_ENVS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Remote store and auth connection. `None` means local-only operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConnection>,
    #[serde(default)]
    pub advisory: AdvisoryConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Connection settings in the shape of a web client config object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreConnection {
    pub api_key: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    /// Overrides the Identity Toolkit base URL (used by tests and emulators).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvisoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "AdvisoryConfig::default_model")]
    pub model: String,
    #[serde(default = "AdvisoryConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "AdvisoryConfig::default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::default_model(),
            base_url: Self::default_base_url(),
            request_timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl AdvisoryConfig {
    pub fn default_model() -> String {
        "gemini-2.5-flash".into()
    }

    pub fn default_base_url() -> String {
        "https://generativelanguage.googleapis.com/v1beta".into()
    }

    pub fn default_timeout_secs() -> u64 {
        30
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// The configured key, if it is present and plausibly usable.
    pub fn usable_api_key(&self) -> Option<String> {
        present_secret(self.api_key.clone())
    }
}

/// What `add_transaction` does when the referenced account is unknown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownAccountPolicy {
    /// Record the transaction and skip the balance update.
    #[default]
    RecordOnly,
    /// Reject the transaction without writing anything.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    #[serde(default = "LedgerConfig::default_page_size")]
    pub transaction_page_size: usize,
    #[serde(default)]
    pub unknown_account_policy: UnknownAccountPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transaction_page_size: Self::default_page_size(),
            unknown_account_policy: UnknownAccountPolicy::default(),
        }
    }
}

impl LedgerConfig {
    pub fn default_page_size() -> usize {
        50
    }
}

impl AppConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlays environment values on top of this configuration.
    ///
    /// An unparsable store config is logged and leaves the store unset, which
    /// puts the ledger in local mode rather than failing startup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = present_secret(lookup(STORE_CONFIG_ENV)) {
            match serde_json::from_str::<StoreConnection>(&raw) {
                Ok(connection) => self.store = Some(connection),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        "{} is not valid JSON; operating in local-only mode",
                        STORE_CONFIG_ENV
                    );
                    self.store = None;
                }
            }
        }
        if let Some(key) = API_KEY_ENVS
            .iter()
            .find_map(|name| present_secret(lookup(name)))
        {
            self.advisory.api_key = Some(key);
        }
    }

    /// True when no remote store is configured.
    pub fn is_offline(&self) -> bool {
        self.store.is_none()
    }
}

/// Handles persistence of [`AppConfig`] as a JSON file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Uses `<config dir>/smart_finance/config.json`.
    pub fn default_location() -> Self {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file; a missing file yields the defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))
        } else {
            Ok(AppConfig::default())
        }
    }

    /// File values with the process environment layered on top.
    pub fn resolve(&self) -> Result<AppConfig, ConfigError> {
        let mut config = self.load()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overlay_reads_store_and_key() {
        let mut config = AppConfig::default();
        config.apply_env(lookup(&[
            (
                STORE_CONFIG_ENV,
                r#"{"apiKey":"web-key","projectId":"smart-finance","authDomain":"sf.example"}"#,
            ),
            ("API_KEY", "gen-key"),
        ]));
        let store = config.store.clone().expect("store parsed");
        assert_eq!(store.project_id, "smart-finance");
        assert_eq!(store.auth_domain.as_deref(), Some("sf.example"));
        assert_eq!(config.advisory.api_key.as_deref(), Some("gen-key"));
    }

    #[test]
    fn placeholder_values_count_as_absent() {
        let mut config = AppConfig::default();
        config.apply_env(lookup(&[(STORE_CONFIG_ENV, "undefined"), ("API_KEY", "  ")]));
        assert!(config.is_offline());
        assert!(config.advisory.api_key.is_none());
    }

    #[test]
    fn invalid_store_json_falls_back_to_offline() {
        let mut config = AppConfig::default();
        config.apply_env(lookup(&[(STORE_CONFIG_ENV, "{not json")]));
        assert!(config.is_offline());
    }

    #[test]
    fn secondary_key_variable_is_used() {
        let mut config = AppConfig::default();
        config.apply_env(lookup(&[("GEMINI_API_KEY", "second")]));
        assert_eq!(config.advisory.usable_api_key().as_deref(), Some("second"));
    }

    #[test]
    fn save_and_load_roundtrip_through_file() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::new(temp.path().join("nested").join("config.json"));
        assert_eq!(manager.load().unwrap(), AppConfig::default());

        let mut config = AppConfig::default();
        config.ledger.unknown_account_policy = UnknownAccountPolicy::Reject;
        config.advisory.request_timeout_secs = 5;
        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded, config);
        assert!(!tmp_path(manager.path()).exists());
    }

    #[test]
    fn partial_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"ledger":{"unknown_account_policy":"reject"}}"#).unwrap();
        let loaded = ConfigManager::new(path).load().unwrap();
        assert_eq!(loaded.ledger.transaction_page_size, 50);
        assert_eq!(loaded.ledger.unknown_account_policy, UnknownAccountPolicy::Reject);
        assert_eq!(loaded.advisory.model, AdvisoryConfig::default_model());
    }

    #[test]
    fn environment_overrides_file_values() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::new(temp.path().join("config.json"));
        let mut on_disk = AppConfig::default();
        on_disk.advisory.api_key = Some("file-key".into());
        manager.save(&on_disk).unwrap();

        let mut config = manager.load().unwrap();
        config.apply_env(lookup(&[("API_KEY", "env-key")]));
        assert_eq!(config.advisory.api_key.as_deref(), Some("env-key"));

        let mut untouched = manager.load().unwrap();
        untouched.apply_env(lookup(&[]));
        assert_eq!(untouched.advisory.api_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn malformed_file_is_a_serde_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "[").unwrap();
        let err = ConfigManager::new(path).load().unwrap_err();
        assert!(matches!(err, ConfigError::Serde(_)));
    }
}
