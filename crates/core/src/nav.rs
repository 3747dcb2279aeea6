#![allow(missing_docs)]

//! Sidebar navigation links derived from the session flag.

/// Glyph shown next to a navigation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    Home,
    Compass,
    Settings,
    Lock,
}

impl Icon {
    /// Terminal glyph for the icon.
    pub fn glyph(self) -> &'static str {
        match self {
            Icon::Home => "⌂",
            Icon::Compass => "◎",
            Icon::Settings => "⚙",
            Icon::Lock => "🔒",
        }
    }
}

/// One navigable destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NavLink {
    /// Label shown in the sidebar.
    pub name: &'static str,
    /// Route path the link opens.
    pub href: &'static str,
    pub icon: Icon,
}

/// Links shown to an authenticated administrator.
pub const ADMIN_NAV_LINKS: &[NavLink] = &[
    NavLink {
        name: "Home",
        href: "/",
        icon: Icon::Home,
    },
    NavLink {
        name: "Explore",
        href: "/explore",
        icon: Icon::Compass,
    },
    NavLink {
        name: "Settings",
        href: "/settings",
        icon: Icon::Settings,
    },
];

/// Links shown to visitors without a session.
pub const GUEST_NAV_LINKS: &[NavLink] = &[
    NavLink {
        name: "Home",
        href: "/",
        icon: Icon::Home,
    },
    NavLink {
        name: "Explore",
        href: "/explore",
        icon: Icon::Compass,
    },
    NavLink {
        name: "Login",
        href: "/login",
        icon: Icon::Lock,
    },
];

/// Pick the link sequence for the given session flag.
pub fn select(is_authenticated: bool) -> &'static [NavLink] {
    if is_authenticated {
        ADMIN_NAV_LINKS
    } else {
        GUEST_NAV_LINKS
    }
}

/// Whether `link` should be highlighted while `current_path` is shown.
///
/// The root link only matches exactly; others also match nested paths.
pub fn is_active(link: &NavLink, current_path: &str) -> bool {
    let path = current_path.split(['?', '#']).next().unwrap_or(current_path);
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    if link.href == "/" {
        return path == "/";
    }
    path == link.href
        || path
            .strip_prefix(link.href)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_a_pure_function_of_the_flag() {
        for _ in 0..3 {
            assert_eq!(select(true), ADMIN_NAV_LINKS);
            assert_eq!(select(false), GUEST_NAV_LINKS);
        }
        assert_ne!(select(true), select(false));
    }

    #[test]
    fn only_guests_see_login() {
        assert!(select(false).iter().any(|link| link.href == "/login"));
        assert!(!select(true).iter().any(|link| link.href == "/login"));
    }

    #[test]
    fn root_link_matches_exactly() {
        let home = &ADMIN_NAV_LINKS[0];
        assert!(is_active(home, "/"));
        assert!(!is_active(home, "/explore"));

        let settings = &ADMIN_NAV_LINKS[2];
        assert!(is_active(settings, "/settings"));
        assert!(is_active(settings, "/settings/"));
        assert!(is_active(settings, "/settings/profile?tab=1"));
        assert!(!is_active(settings, "/settingsx"));
    }
}
