//! Application and sync configuration.
//!
//! `AppConfig` is read from a JSON file and then overridden from the
//! environment. Only public values belong here (project URL and anon key);
//! account credentials live in the session store.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{compact_text, is_http_url, normalize_text_option};

pub const ENV_SUPABASE_URL: &str = "LIMBER_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "LIMBER_SUPABASE_ANON_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PUSH_BATCH_SIZE: usize = 500;
const DEFAULT_PULL_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub sync: SyncSettings,
}

/// The `sync` section of the config file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct SyncSettings {
    pub timeout_secs: u64,
    pub push_batch_size: usize,
    pub pull_page_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            push_batch_size: DEFAULT_PUSH_BATCH_SIZE,
            pull_page_size: DEFAULT_PULL_PAGE_SIZE,
        }
    }
}

/// A validated Supabase project endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: String,
}

impl AppConfig {
    /// Read the config file at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(payload) => serde_json::from_str(&payload).map_err(|error| {
                Error::Config(compact_text(&format!("{}: {error}", path.display())))
            }),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(error.into()),
        }
    }

    /// Parse a JSON config payload
    pub fn parse(payload: &str) -> Result<Self> {
        serde_json::from_str(payload)
            .map_err(|error| Error::Config(compact_text(&format!("invalid config JSON: {error}"))))
    }

    /// Apply process environment overrides
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`; blank values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = normalize_text_option(lookup(ENV_SUPABASE_URL)) {
            self.supabase_url = Some(url);
        }
        if let Some(anon_key) = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY)) {
            self.supabase_anon_key = Some(anon_key);
        }
        self
    }

    /// The configured Supabase project, if any.
    ///
    /// Setting only one of URL and anon key is an error, as is a URL without
    /// an http(s) scheme.
    pub fn supabase(&self) -> Result<Option<SupabaseSettings>> {
        let url = normalize_text_option(self.supabase_url.clone());
        let anon_key = normalize_text_option(self.supabase_anon_key.clone());

        match (url, anon_key) {
            (None, None) => Ok(None),
            (Some(url), Some(anon_key)) => {
                if !is_http_url(&url) {
                    return Err(Error::Config(
                        "supabase_url must include http:// or https://".to_string(),
                    ));
                }
                Ok(Some(SupabaseSettings {
                    url: url.trim_end_matches('/').to_string(),
                    anon_key,
                }))
            }
            (Some(_), None) => Err(Error::Config(format!(
                "supabase_anon_key is required when supabase_url is set (or set {ENV_SUPABASE_ANON_KEY})"
            ))),
            (None, Some(_)) => Err(Error::Config(format!(
                "supabase_url is required when supabase_anon_key is set (or set {ENV_SUPABASE_URL})"
            ))),
        }
    }

    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default()
            .with_timeout(Duration::from_secs(self.sync.timeout_secs))
            .with_push_batch_size(self.sync.push_batch_size)
            .with_pull_page_size(self.sync.pull_page_size)
    }
}

/// Runtime knobs for a sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Upper bound for each individual remote call
    pub remote_timeout: Duration,
    /// Maximum rows per upsert request
    pub push_batch_size: usize,
    /// Rows requested per page when pulling
    pub pull_page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            push_batch_size: DEFAULT_PUSH_BATCH_SIZE,
            pull_page_size: DEFAULT_PULL_PAGE_SIZE,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn with_push_batch_size(mut self, size: usize) -> Self {
        self.push_batch_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_pull_page_size(mut self, size: usize) -> Self {
        self.pull_page_size = size.max(1);
        self
    }
}
