use serde::{Deserialize, Serialize};
use tracing::warn;

/// Display data of the signed-in user, cached next to the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Parse cached profile JSON. Anything unusable is dropped, never an error.
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str::<UserProfile>(raw) {
            Ok(profile) if !profile.name.trim().is_empty() || !profile.email.trim().is_empty() => {
                Some(profile)
            }
            Ok(_) => None,
            Err(err) => {
                warn!("Discarding malformed cached profile: {err}");
                None
            }
        }
    }

    /// Name to show in the sidebar, falling back to the email address.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            self.email.trim()
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_profile() {
        let profile = UserProfile::parse(r#"{"name":"Ada","email":"ada@example.com"}"#);
        assert_eq!(profile, Some(UserProfile::new("Ada", "ada@example.com")));
    }

    #[test]
    fn drops_malformed_or_blank_profiles() {
        assert_eq!(UserProfile::parse("not json"), None);
        assert_eq!(UserProfile::parse(r#"{"name":"Ada"}"#), None);
        assert_eq!(UserProfile::parse(r#"{"name":" ","email":""}"#), None);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let profile = UserProfile::new("", "ada@example.com");
        assert_eq!(profile.display_name(), "ada@example.com");
    }
}
