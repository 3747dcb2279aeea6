//! Cookie-style persistent client storage.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Key/value storage the session reads its credential from.
pub trait TokenStore: Send + Sync {
    /// Current value of `name`, or `None` when absent or expired.
    fn get(&self, name: &str) -> Option<String>;
    /// Store `value` under `name`, replacing any previous value.
    fn set(&self, name: &str, value: &str, expires_at: Option<DateTime<Utc>>) -> Result<()>;
    /// Delete `name`. Removing an absent entry is not an error.
    fn remove(&self, name: &str) -> Result<()>;
}

/// A single stored cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    /// Raw cookie value.
    pub value: String,
    /// Expiry; `None` lives until removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Cookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at > now).unwrap_or(true)
    }
}

type Jar = BTreeMap<String, Cookie>;

/// Cookie jar persisted as JSON on disk.
///
/// The file is read once when the jar is opened; later writes go through to
/// disk immediately so the next process start sees them.
#[derive(Clone)]
pub struct CookieJar {
    path: PathBuf,
    cookies: Arc<RwLock<Jar>>,
}

impl CookieJar {
    /// Open the jar at `path`. Missing or corrupt files yield an empty jar.
    ///
    /// The in-memory jar only changes once the file write succeeded.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cookies = match read_jar(&path) {
            Ok(cookies) => cookies,
            Err(err) => {
                warn!("Ignoring unreadable cookie jar {}: {err:#}", path.display());
                Jar::new()
            }
        };
        debug!(path = %path.display(), entries = cookies.len(), "Cookie jar opened");
        Self {
            path,
            cookies: Arc::new(RwLock::new(cookies)),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, cookies: &Jar) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialized =
            serde_json::to_vec_pretty(cookies).context("failed to serialize cookie jar")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

impl TokenStore for CookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.read();
        cookies
            .get(name)
            .filter(|cookie| cookie.is_live(Utc::now()))
            .map(|cookie| cookie.value.clone())
    }

    fn set(&self, name: &str, value: &str, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        let mut cookies = self.cookies.write();
        let mut next = cookies.clone();
        next.insert(
            name.to_string(),
            Cookie {
                value: value.to_string(),
                expires_at,
            },
        );
        self.persist(&next)?;
        *cookies = next;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let mut cookies = self.cookies.write();
        if !cookies.contains_key(name) {
            return Ok(());
        }
        let mut next = cookies.clone();
        next.remove(name);
        self.persist(&next)?;
        *cookies = next;
        Ok(())
    }
}

fn read_jar(path: &Path) -> Result<Jar> {
    if !path.exists() {
        return Ok(Jar::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Jar::new());
    }
    let cookies = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(cookies)
}

/// Process-local store, used by tests and ephemeral sessions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    cookies: Arc<RwLock<Jar>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .read()
            .get(name)
            .filter(|cookie| cookie.is_live(Utc::now()))
            .map(|cookie| cookie.value.clone())
    }

    fn set(&self, name: &str, value: &str, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        self.cookies.write().insert(
            name.to_string(),
            Cookie {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.cookies.write().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn jar_persists_across_opens() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("cookies.json");

        let jar = CookieJar::open(&path);
        assert_eq!(jar.get("access_token"), None);
        jar.set("access_token", "abc", None)?;

        let reopened = CookieJar::open(&path);
        assert_eq!(reopened.get("access_token").as_deref(), Some("abc"));

        reopened.remove("access_token")?;
        reopened.remove("access_token")?;
        assert_eq!(CookieJar::open(&path).get("access_token"), None);
        Ok(())
    }

    #[test]
    fn corrupt_jar_reads_as_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cookies.json");
        fs::write(&path, "{ not json")?;

        let jar = CookieJar::open(&path);
        assert_eq!(jar.get("access_token"), None);
        jar.set("access_token", "fresh", None)?;
        assert_eq!(CookieJar::open(&path).get("access_token").as_deref(), Some("fresh"));
        Ok(())
    }

    #[test]
    fn failed_write_leaves_jar_unchanged() -> Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file")?;
        let jar = CookieJar::open(blocker.join("cookies.json"));

        assert!(jar.set("access_token", "tok", None).is_err());
        assert_eq!(jar.get("access_token"), None);
        Ok(())
    }

    #[test]
    fn failed_remove_keeps_the_cookie() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cookies.json");
        let jar = CookieJar::open(&path);
        jar.set("access_token", "tok", None)?;

        // A directory in place of the file makes the rewrite fail.
        fs::remove_file(&path)?;
        fs::create_dir(&path)?;
        assert!(jar.remove("access_token").is_err());
        assert_eq!(jar.get("access_token").as_deref(), Some("tok"));
        Ok(())
    }

    #[test]
    fn expired_cookies_are_absent() -> Result<()> {
        let store = MemoryStore::new();
        store.set("old", "x", Some(Utc::now() - Duration::minutes(1)))?;
        store.set("new", "y", Some(Utc::now() + Duration::minutes(1)))?;
        assert_eq!(store.get("old"), None);
        assert_eq!(store.get("new").as_deref(), Some("y"));
        Ok(())
    }
}
