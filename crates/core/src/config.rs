//! Application configuration.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under `~/.config` holding the config file and cookie jar.
pub const CONFIG_DIR: &str = "portal";
/// File name of the JSON config.
pub const CONFIG_FILE: &str = "config.json";
/// Prefix for environment overrides, e.g. `PORTAL_API_BASE_URL`.
pub const ENV_PREFIX: &str = "PORTAL";

/// Runtime configuration shared by the core and the front-end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the backend API (no trailing slash).
    pub api_base_url: String,
    /// Location of the persisted cookie jar.
    pub cookie_path: PathBuf,
    /// Cookie holding the credential token.
    pub token_cookie: String,
    /// Cookie holding the cached user profile JSON.
    pub profile_cookie: String,
    /// Settle window of the search box.
    pub search_delay_ms: u64,
    /// Public route consumers navigate to after logout.
    pub landing_route: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            cookie_path: config_root().join("cookies.json"),
            token_cookie: "access_token".to_string(),
            profile_cookie: "user".to_string(),
            search_delay_ms: 500,
            landing_route: "/".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file layered under environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from an explicit file; a missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        load_layered(path.as_ref(), None)
    }

    /// Search settle window as a `Duration`.
    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }

    /// Join a path onto the API base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Read `path` under `PORTAL_*` overrides. `env` replaces the process
/// environment when given.
fn load_layered(path: &Path, env: Option<config::Map<String, String>>) -> Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(
            config::File::from(path)
                .format(config::FileFormat::Json)
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        )
        .build()
        .with_context(|| format!("failed to read config {}", path.display()))?;
    settings
        .try_deserialize::<AppConfig>()
        .with_context(|| format!("failed to parse config {}", path.display()))
}

/// Root of the portal's files under the user's config directory.
pub fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}

/// Default config file location.
pub fn config_path() -> PathBuf {
    config_root().join(CONFIG_FILE)
}

/// Write a default config file on first run.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: PathBuf) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(&AppConfig::default())
        .context("failed to serialize default config")?;
    fs::write(&path, serialized).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default config");
    Ok(())
}
