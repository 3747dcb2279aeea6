#![allow(missing_docs)]

//! Client-side route table and guard.

use std::collections::BTreeMap;

use tracing::debug;

/// Where unauthenticated visitors of protected pages are sent.
pub const LOGIN_ROUTE: &str = "/login";
/// Where authenticated visitors of the login page are sent.
pub const HOME_ROUTE: &str = "/";

const MAX_REDIRECTS: usize = 4;

/// A renderable page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Login,
    ForgotPassword,
    /// Reset form reached from the emailed link.
    ResetPassword {
        uid: String,
        token: String,
    },
    Home,
    Explore,
    Settings,
    NotFound {
        path: String,
    },
}

impl Page {
    /// Frame the page is drawn in.
    pub fn layout(&self) -> Layout {
        match self {
            Page::Login | Page::ForgotPassword | Page::ResetPassword { .. } => Layout::Standalone,
            _ => Layout::Main,
        }
    }

    /// Whether the page requires an authenticated session.
    pub fn is_protected(&self) -> bool {
        matches!(self, Page::Settings)
    }

    /// Title used in headers.
    pub fn title(&self) -> &'static str {
        match self {
            Page::Login => "Login",
            Page::ForgotPassword => "Forgot Password",
            Page::ResetPassword { .. } => "Reset Password",
            Page::Home => "Home",
            Page::Explore => "Explore",
            Page::Settings => "Settings",
            Page::NotFound { .. } => "Not Found",
        }
    }
}

/// Page frame: standalone pages have no sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Standalone,
    Main,
}

/// Result of matching a location against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Render(Page),
    Redirect(String),
}

/// A path split into its route part and decoded query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl Location {
    pub fn parse(target: &str) -> Self {
        let target = target.split('#').next().unwrap_or_default();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        let path = normalize_path(path);
        let query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self { path, query }
    }

    /// Query parameter, empty when missing.
    pub fn param(&self, name: &str) -> String {
        self.query.get(name).cloned().unwrap_or_default()
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Match `target` and apply the session guard.
pub fn resolve(target: &str, is_authenticated: bool) -> Resolution {
    let location = Location::parse(target);
    let page = match location.path.as_str() {
        "/login" => Page::Login,
        "/forgot-password" => Page::ForgotPassword,
        "/reset-password" => Page::ResetPassword {
            uid: location.param("uid"),
            token: location.param("token"),
        },
        "/" => Page::Home,
        "/explore" => Page::Explore,
        "/settings" => Page::Settings,
        _ => Page::NotFound {
            path: location.path.clone(),
        },
    };

    if page.is_protected() && !is_authenticated {
        return Resolution::Redirect(LOGIN_ROUTE.to_string());
    }
    if page == Page::Login && is_authenticated {
        return Resolution::Redirect(HOME_ROUTE.to_string());
    }
    Resolution::Render(page)
}

/// Navigation state of the front-end: current page plus history.
#[derive(Debug, Clone)]
pub struct Router {
    path: String,
    page: Page,
    history: Vec<String>,
}

impl Router {
    /// Start at `initial`, following redirects.
    pub fn new(initial: &str, is_authenticated: bool) -> Self {
        let (path, page) = follow(initial, is_authenticated);
        Self {
            path,
            page,
            history: Vec::new(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Navigate to `target`, pushing the current path onto the history.
    pub fn navigate(&mut self, target: &str, is_authenticated: bool) -> &Page {
        let (path, page) = follow(target, is_authenticated);
        if path != self.path {
            let previous = std::mem::replace(&mut self.path, path);
            self.history.push(previous);
        }
        self.page = page;
        &self.page
    }

    /// Return to the previous path. Returns `false` when there is none.
    pub fn back(&mut self, is_authenticated: bool) -> bool {
        match self.history.pop() {
            Some(previous) => {
                let (path, page) = follow(&previous, is_authenticated);
                self.path = path;
                self.page = page;
                true
            }
            None => false,
        }
    }

    /// Re-run the guard for the current path after the session changed.
    pub fn refresh(&mut self, is_authenticated: bool) -> &Page {
        let (path, page) = follow(&self.path, is_authenticated);
        if path != self.path {
            debug!(from = %self.path, to = %path, "Guard redirected after session change");
        }
        self.path = path;
        self.page = page;
        &self.page
    }
}

fn follow(target: &str, is_authenticated: bool) -> (String, Page) {
    let mut current = target.to_string();
    for _ in 0..MAX_REDIRECTS {
        match resolve(&current, is_authenticated) {
            Resolution::Render(page) => return (current, page),
            Resolution::Redirect(next) => {
                debug!(from = %current, to = %next, "Route redirect");
                current = next;
            }
        }
    }
    let path = Location::parse(&current).path;
    (current, Page::NotFound { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_route_table() {
        assert_eq!(resolve("/", false), Resolution::Render(Page::Home));
        assert_eq!(resolve("", false), Resolution::Render(Page::Home));
        assert_eq!(resolve("/explore/", false), Resolution::Render(Page::Explore));
        assert_eq!(
            resolve("/forgot-password", false),
            Resolution::Render(Page::ForgotPassword)
        );
        assert_eq!(
            resolve("/missing/page", true),
            Resolution::Render(Page::NotFound {
                path: "/missing/page".to_string()
            })
        );
    }

    #[test]
    fn reset_password_reads_query() {
        assert_eq!(
            resolve("/reset-password?uid=MQ&token=a%2Db", false),
            Resolution::Render(Page::ResetPassword {
                uid: "MQ".to_string(),
                token: "a-b".to_string(),
            })
        );
        assert_eq!(
            resolve("/reset-password", false),
            Resolution::Render(Page::ResetPassword {
                uid: String::new(),
                token: String::new(),
            })
        );
    }

    #[test]
    fn guard_redirects_by_session() {
        assert_eq!(
            resolve("/settings", false),
            Resolution::Redirect(LOGIN_ROUTE.to_string())
        );
        assert_eq!(resolve("/settings", true), Resolution::Render(Page::Settings));
        assert_eq!(
            resolve("/login", true),
            Resolution::Redirect(HOME_ROUTE.to_string())
        );
        assert_eq!(Page::Login.layout(), Layout::Standalone);
        assert_eq!(Page::Settings.layout(), Layout::Main);
    }

    #[test]
    fn router_tracks_history_and_reguards() {
        let mut router = Router::new("/settings", false);
        assert_eq!(router.page(), &Page::Login);
        assert_eq!(router.path(), "/login");

        router.navigate("/explore", false);
        assert_eq!(router.page(), &Page::Explore);

        assert!(router.back(false));
        assert_eq!(router.page(), &Page::Login);
        assert!(!router.back(false));

        router.navigate("/settings", true);
        assert_eq!(router.page(), &Page::Settings);
        router.refresh(false);
        assert_eq!(router.page(), &Page::Login);
    }
}
