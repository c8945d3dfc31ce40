use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, path::PathBuf, time::Duration};

use crate::{backoff::BackoffPolicy, provider::ProviderId, toml_file};

/// Credentials for one provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// On-disk settings of the refresh tool.
///
/// ```toml
/// default_provider = "openweather"
///
/// [providers.openweather]
/// api_key = "..."
///
/// [retry]
/// base = 2
/// unit_ms = 1000
/// max_attempts = 5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Provider used by `weather refresh`.
    pub default_provider: Option<ProviderId>,

    /// Keyed by provider id.
    pub providers: BTreeMap<String, ProviderConfig>,

    pub retry: RetryConfig,
}

/// `[retry]` section. Failed call `i` waits `unit_ms * base^i` before the
/// next one, for `i` in `0..max_attempts`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub base: u32,
    pub unit_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { base: 2, unit_ms: 1000, max_attempts: 5 }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> Result<BackoffPolicy> {
        BackoffPolicy::new(self.base, Duration::from_millis(self.unit_ms), self.max_attempts)
            .context("Invalid [retry] section in config")
    }
}

impl Config {
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        self.default_provider.ok_or_else(|| {
            anyhow!(
                "No default provider configured.\n\
                 Hint: run `weather configure <provider>` (e.g. `weather configure openweather`) first."
            )
        })
    }

    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id);
    }

    /// Load from the platform config directory; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        toml_file::read_or_default(path, "config")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        toml_file::write(path, self, "config")
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Set or replace a key; the first configured provider becomes the default.
    pub fn upsert_provider_api_key(&mut self, id: ProviderId, api_key: String) {
        self.providers.insert(id.as_str().to_string(), ProviderConfig { api_key });
        self.default_provider.get_or_insert(id);
    }

    pub fn provider_api_key(&self, id: ProviderId) -> Option<&str> {
        self.providers.get(id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, id: ProviderId) -> bool {
        self.provider_api_key(id).is_some()
    }
}

pub(crate) fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weather-task", "weather-cli")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
