//! Engine and store configuration.
//!
//! `StoreSettings` is the serde shape clients load from disk and overlay with
//! environment values; it resolves into an `EngineConfig` plus a concrete
//! `StoreConfig`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::{MemoStore, SqliteMemoStore, SupabaseMemoStore};

/// Quiet period between the last edit and its autosave.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
/// Request timeout for remote stores.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Runtime tuning for the editing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub debounce: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl EngineConfig {
    pub const fn with_debounce_ms(millis: u64) -> Self {
        Self {
            debounce: Duration::from_millis(millis),
        }
    }
}

/// Which backend holds the memo collections.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Local SQLite file
    Sqlite { path: PathBuf },
    /// Supabase project reached through PostgREST
    Supabase {
        url: String,
        anon_key: String,
        timeout: Duration,
    },
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
            Self::Supabase { url, timeout, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .field("anon_key", &"<redacted>")
                .field("timeout", timeout)
                .finish(),
        }
    }
}

impl StoreConfig {
    /// Open the configured store.
    pub fn open(&self) -> Result<Arc<dyn MemoStore>> {
        match self {
            Self::Sqlite { path } => {
                tracing::debug!("Opening SQLite memo store at {}", path.display());
                Ok(Arc::new(SqliteMemoStore::open(path)?))
            }
            Self::Supabase {
                url,
                anon_key,
                timeout,
            } => {
                tracing::debug!("Using Supabase memo store at {}", url);
                Ok(Arc::new(SupabaseMemoStore::new(
                    url,
                    anon_key.clone(),
                    *timeout,
                )?))
            }
        }
    }

    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Supabase { .. })
    }
}

/// Persisted client settings. Every field is optional; missing values fall
/// back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StoreSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_anon_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
}

impl StoreSettings {
    /// Overlay `overrides` on top of `self`; set fields win.
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            db_path: overrides.db_path.or(self.db_path),
            supabase_url: overrides.supabase_url.or(self.supabase_url),
            supabase_anon_key: overrides.supabase_anon_key.or(self.supabase_anon_key),
            http_timeout_secs: overrides.http_timeout_secs.or(self.http_timeout_secs),
            debounce_ms: overrides.debounce_ms.or(self.debounce_ms),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::with_debounce_ms(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }

    /// Pick the store backend.
    ///
    /// Supabase is used when both URL and anon key are set; setting only one
    /// of them is an error. Otherwise SQLite at `db_path` or `default_db_path`.
    pub fn store_config(&self, default_db_path: impl FnOnce() -> PathBuf) -> Result<StoreConfig> {
        let url = non_blank(self.supabase_url.clone());
        let anon_key = non_blank(self.supabase_anon_key.clone());

        match (url, anon_key) {
            (Some(url), Some(anon_key)) => {
                if !has_http_scheme(&url) {
                    return Err(Error::Config(
                        "supabase_url must include http:// or https://".to_string(),
                    ));
                }
                let timeout =
                    Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS));
                Ok(StoreConfig::Supabase {
                    url: url.trim_end_matches('/').to_string(),
                    anon_key,
                    timeout,
                })
            }
            (Some(_), None) => Err(Error::Config(
                "supabase_anon_key is required when supabase_url is set".to_string(),
            )),
            (None, Some(_)) => Err(Error::Config(
                "supabase_url is required when supabase_anon_key is set".to_string(),
            )),
            (None, None) => {
                let path = self
                    .db_path
                    .clone()
                    .filter(|path| !path.as_os_str().is_empty())
                    .unwrap_or_else(default_db_path);
                Ok(StoreConfig::Sqlite { path })
            }
        }
    }
}

/// Trimmed text, or `None` when the value is missing or blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub(crate) fn has_http_scheme(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}
