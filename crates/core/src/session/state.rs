use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{config::AppConfig, store::TokenStore};

use super::profile::UserProfile;

/// Cookie names and routes the session needs from configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub token_cookie: String,
    pub profile_cookie: String,
    pub landing_route: String,
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            token_cookie: config.token_cookie.clone(),
            profile_cookie: config.profile_cookie.clone(),
            landing_route: config.landing_route.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Single authoritative authentication flag shared by every consumer.
///
/// Cloning the handle shares the same flag. Writes are published through a
/// `watch` channel, so a read after `set` or `logout` always sees the new value
/// and subscribers are woken to re-render.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn TokenStore>,
    settings: SessionSettings,
    flag: watch::Sender<bool>,
    profile: RwLock<Option<UserProfile>>,
}

impl SessionState {
    /// Derive the flag from the stored token. Called once per process.
    pub fn initialize(store: Arc<dyn TokenStore>, settings: SessionSettings) -> Self {
        let authenticated = store
            .get(&settings.token_cookie)
            .map(|token| !token.is_empty())
            .unwrap_or(false);
        let profile = if authenticated {
            store
                .get(&settings.profile_cookie)
                .and_then(|raw| UserProfile::parse(&raw))
        } else {
            None
        };
        info!(authenticated, has_profile = profile.is_some(), "Session initialized");

        let (flag, _) = watch::channel(authenticated);
        Self {
            inner: Arc::new(Inner {
                store,
                settings,
                flag,
                profile: RwLock::new(profile),
            }),
        }
    }

    /// Current flag value.
    pub fn read(&self) -> bool {
        *self.inner.flag.borrow()
    }

    /// Overwrite the flag and notify subscribers.
    pub fn set(&self, authenticated: bool) {
        let previous = self.inner.flag.send_replace(authenticated);
        if previous != authenticated {
            info!(authenticated, "Session flag changed");
        }
    }

    /// Receiver that observes every change of the flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.flag.subscribe()
    }

    /// Cached profile of the signed-in user, if one was stored.
    pub fn profile(&self) -> Option<UserProfile> {
        self.inner.profile.read().clone()
    }

    /// Persist a freshly issued token (and profile) and mark the session
    /// authenticated.
    pub fn login(&self, token: &str, profile: Option<UserProfile>) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            anyhow::bail!("refusing to store an empty token");
        }
        let store = &self.inner.store;
        let settings = &self.inner.settings;
        store
            .set(&settings.token_cookie, token, None)
            .context("failed to store credential token")?;
        match &profile {
            Some(profile) => {
                let raw = serde_json::to_string(profile).context("failed to encode profile")?;
                store
                    .set(&settings.profile_cookie, &raw, None)
                    .context("failed to store profile")?;
            }
            None => store
                .remove(&settings.profile_cookie)
                .context("failed to clear stale profile")?,
        }
        *self.inner.profile.write() = profile;
        self.set(true);
        Ok(())
    }

    /// Clear the stored credential, drop the flag and return the route
    /// consumers should navigate to.
    ///
    /// The in-memory flag is cleared even when the store cannot be written; the
    /// storage error is still reported.
    pub fn logout(&self) -> Result<String> {
        let store = &self.inner.store;
        let settings = &self.inner.settings;
        let cleared = store
            .remove(&settings.token_cookie)
            .and_then(|_| store.remove(&settings.profile_cookie));

        *self.inner.profile.write() = None;
        self.set(false);

        if let Err(err) = cleared {
            warn!("Logout could not clear stored credentials: {err:#}");
            return Err(err).context("failed to clear stored credentials");
        }
        info!(redirect = %settings.landing_route, "Logged out");
        Ok(settings.landing_route.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        nav::{self, ADMIN_NAV_LINKS, GUEST_NAV_LINKS},
        router::{Page, Router},
        store::{CookieJar, MemoryStore},
    };
    use chrono::{DateTime, Utc};
    use tempfile::tempdir;

    /// Store that holds a token but refuses every write.
    struct ReadOnlyStore;

    impl TokenStore for ReadOnlyStore {
        fn get(&self, name: &str) -> Option<String> {
            (name == "access_token").then(|| "abc".to_string())
        }

        fn set(&self, _: &str, _: &str, _: Option<DateTime<Utc>>) -> Result<()> {
            anyhow::bail!("store is read-only")
        }

        fn remove(&self, _: &str) -> Result<()> {
            anyhow::bail!("store is read-only")
        }
    }

    fn session_with(token: Option<&str>) -> (MemoryStore, SessionState) {
        let store = MemoryStore::new();
        if let Some(token) = token {
            store.set("access_token", token, None).unwrap();
        }
        let session = SessionState::initialize(Arc::new(store.clone()), SessionSettings::default());
        (store, session)
    }

    #[test]
    fn flag_follows_token_presence() {
        for (token, expected) in [
            (None, false),
            (Some(""), false),
            (Some("   "), true),
            (Some("abc"), true),
        ] {
            let (_, session) = session_with(token);
            assert_eq!(session.read(), expected, "token {token:?}");
        }
    }

    #[test]
    fn absent_token_selects_guest_links() {
        let (_, session) = session_with(None);
        assert!(!session.read());
        assert_eq!(nav::select(session.read()), GUEST_NAV_LINKS);
    }

    #[test]
    fn set_is_visible_to_every_handle_immediately() {
        let (_, session) = session_with(None);
        let sidebar = session.clone();
        let mut guard = session.subscribe();

        session.set(true);
        assert!(sidebar.read());
        assert_eq!(nav::select(sidebar.read()), ADMIN_NAV_LINKS);
        assert!(guard.has_changed().unwrap());
        assert!(*guard.borrow_and_update());
    }

    #[test]
    fn logout_clears_token_and_survives_reload() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cookies.json");
        let jar = CookieJar::open(&path);
        jar.set("access_token", "abc", None)?;
        jar.set("user", r#"{"name":"Ada","email":"ada@example.com"}"#, None)?;

        let session = SessionState::initialize(Arc::new(jar.clone()), SessionSettings::default());
        assert!(session.read());
        assert_eq!(session.profile().map(|p| p.name), Some("Ada".to_string()));

        let redirect = session.logout()?;
        assert_eq!(redirect, "/");
        assert!(!session.read());
        assert_eq!(session.profile(), None);
        assert_eq!(jar.get("access_token"), None);

        let reloaded =
            SessionState::initialize(Arc::new(CookieJar::open(&path)), SessionSettings::default());
        assert!(!reloaded.read());
        Ok(())
    }

    #[test]
    fn malformed_profile_does_not_affect_flag() {
        let store = MemoryStore::new();
        store.set("access_token", "abc", None).unwrap();
        store.set("user", "{broken", None).unwrap();
        let session = SessionState::initialize(Arc::new(store), SessionSettings::default());
        assert!(session.read());
        assert_eq!(session.profile(), None);
    }

    #[test]
    fn login_persists_token_and_profile() -> Result<()> {
        let (store, session) = session_with(None);
        assert!(session.login("  ", None).is_err());
        assert!(!session.read());

        let profile = UserProfile::new("Ada", "ada@example.com");
        session.login("tok", Some(profile.clone()))?;
        assert!(session.read());
        assert_eq!(session.profile(), Some(profile));
        assert_eq!(store.get("access_token").as_deref(), Some("tok"));

        let reloaded = SessionState::initialize(Arc::new(store), SessionSettings::default());
        assert!(reloaded.read());
        assert_eq!(reloaded.profile().map(|p| p.email), Some("ada@example.com".to_string()));
        Ok(())
    }

    #[test]
    fn logout_clears_flag_when_store_fails() {
        let session = SessionState::initialize(Arc::new(ReadOnlyStore), SessionSettings::default());
        assert!(session.read());
        let mut sidebar = session.subscribe();

        assert!(session.logout().is_err());
        assert!(!session.read());
        assert!(sidebar.has_changed().unwrap());
        assert!(!*sidebar.borrow_and_update());
        assert_eq!(session.profile(), None);
    }

    #[tokio::test]
    async fn guard_follows_session_changes() -> Result<()> {
        let (_, session) = session_with(Some("abc"));
        let mut router = Router::new("/settings", session.read());
        assert_eq!(router.page(), &Page::Settings);

        let mut changes = session.subscribe();
        let landing = session.logout()?;
        assert_eq!(landing, "/");

        changes.changed().await?;
        router.refresh(*changes.borrow_and_update());
        assert_eq!(router.page(), &Page::Login);
        assert_eq!(router.path(), "/login");

        session.set(true);
        changes.changed().await?;
        router.navigate("/settings", *changes.borrow_and_update());
        assert_eq!(router.page(), &Page::Settings);
        Ok(())
    }
}
