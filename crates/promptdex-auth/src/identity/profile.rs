//! Provider profile attributes.
//!
//! Raw attribute maps returned by provider userinfo endpoints are
//! normalized into a [`ProviderProfile`] before resolution. Only the
//! attributes the resolver consumes are kept; blank values are treated as
//! absent.

use serde::{Deserialize, Serialize};

/// Normalized profile attributes from an identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// The provider's login handle (GitHub `login`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,

    /// The provider's preferred display name (OIDC `preferred_username`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Email address, if the provider discloses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProviderProfile {
    /// Builds a profile from a provider's raw JSON attribute map.
    ///
    /// Null, missing, non-string, and blank attributes all normalize to
    /// `None`.
    #[must_use]
    pub fn from_attributes(attributes: &serde_json::Value) -> Self {
        Self {
            login: text_attribute(attributes, "login"),
            preferred_username: text_attribute(attributes, "preferred_username"),
            name: text_attribute(attributes, "name"),
            email: text_attribute(attributes, "email"),
        }
    }

    /// Sets the login handle.
    #[must_use]
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    /// Sets the preferred display name.
    #[must_use]
    pub fn with_preferred_username(mut self, preferred: impl Into<String>) -> Self {
        self.preferred_username = Some(preferred.into());
        self
    }

    /// Sets the full name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Extracts a non-blank string attribute.
fn text_attribute(attributes: &serde_json::Value, key: &str) -> Option<String> {
    attributes
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_github_attributes() {
        let profile = ProviderProfile::from_attributes(&json!({
            "login": "octocat",
            "id": 583_231,
            "name": "The Octocat",
            "email": null
        }));

        assert_eq!(profile.login.as_deref(), Some("octocat"));
        assert_eq!(profile.name.as_deref(), Some("The Octocat"));
        assert!(profile.email.is_none());
        assert!(profile.preferred_username.is_none());
    }

    #[test]
    fn test_from_oidc_attributes() {
        let profile = ProviderProfile::from_attributes(&json!({
            "sub": "1234567890",
            "preferred_username": "jane.d",
            "name": "Jane Doe",
            "email": "jane@example.com"
        }));

        assert_eq!(profile.preferred_username.as_deref(), Some("jane.d"));
        assert_eq!(profile.email.as_deref(), Some("jane@example.com"));
        assert!(profile.login.is_none());
    }

    #[test]
    fn test_blank_attributes_are_absent() {
        let profile = ProviderProfile::from_attributes(&json!({
            "login": "  ",
            "email": ""
        }));

        assert!(profile.login.is_none());
        assert!(profile.email.is_none());
    }
}
