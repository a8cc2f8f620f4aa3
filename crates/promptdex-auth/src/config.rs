//! Authentication configuration.
//!
//! Configuration for the identity core: token signing, the post-login
//! redirect allow-list, the transient authorization-request cookie, and
//! external provider client registrations.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! public_url = "https://api.promptdex.dev"
//!
//! [auth.token]
//! secret = "change-me-to-a-long-random-value-please!"
//! lifetime = "1day"
//!
//! [auth.redirect]
//! authorized_uris = ["https://promptdex.dev/oauth2/redirect"]
//!
//! [auth.providers.github]
//! client_id = "..."
//! client_secret = "..."
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Minimum accepted signing secret length in bytes (HS256 key material).
const MIN_SECRET_BYTES: usize = 32;

/// Root authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Public base URL of this server, used to build the provider
    /// callback URL (`/login/oauth2/code/{provider}`).
    pub public_url: Url,

    /// Token signing configuration.
    pub token: TokenConfig,

    /// Post-login redirect allow-list.
    pub redirect: RedirectConfig,

    /// Transient authorization-request cookie configuration.
    pub cookie: CookieConfig,

    /// External identity provider registrations.
    pub providers: ProvidersConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            public_url: Url::parse("http://localhost:8080").expect("static URL parses"),
            token: TokenConfig::default(),
            redirect: RedirectConfig::default(),
            cookie: CookieConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Validates the configuration at startup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a too-short signing secret or an
    /// empty redirect allow-list. Both invariants are load-bearing: the
    /// secret feeds the HMAC key directly, and the allow-list is the only
    /// source of post-login redirect targets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::InvalidValue(format!(
                "auth.token.secret must be at least {MIN_SECRET_BYTES} bytes, got {}",
                self.token.secret.len()
            )));
        }
        if self.redirect.authorized_uris.is_empty() {
            return Err(ConfigError::MissingValue(
                "auth.redirect.authorized_uris must list at least one URI".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the callback URL registered with the given provider.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `public_url` cannot be joined with the
    /// callback path (e.g. a `mailto:` base).
    pub fn callback_url(&self, provider_id: &str) -> Result<Url, ConfigError> {
        self.public_url
            .join(&format!("/login/oauth2/code/{provider_id}"))
            .map_err(|e| ConfigError::InvalidValue(format!("auth.public_url: {e}")))
    }
}

/// Token signing configuration.
///
/// The secret is process-wide, immutable after startup, and never rotated
/// in this design. Tokens are signed symmetrically (HS256).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Symmetric signing secret.
    pub secret: String,

    /// Token lifetime from issuance to expiry.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            lifetime: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Post-login redirect configuration.
///
/// After a successful federated login the user agent is redirected to the
/// first URI in this list with the freshly minted token appended as a
/// query parameter. Targets are never taken from request data.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Ordered allow-list of trusted frontend redirect URIs.
    pub authorized_uris: Vec<Url>,
}

impl RedirectConfig {
    /// Returns the redirect target for successful logins.
    ///
    /// Always the first configured URI; `None` only for an unvalidated
    /// (empty) configuration.
    #[must_use]
    pub fn target(&self) -> Option<&Url> {
        self.authorized_uris.first()
    }

    /// Returns `true` if `uri` is one of the configured targets.
    #[must_use]
    pub fn is_authorized(&self, uri: &Url) -> bool {
        self.authorized_uris.iter().any(|u| u == uri)
    }
}

/// Transient authorization-request cookie configuration.
///
/// The cookie replaces a server-side session: it carries the pending
/// authorization state between the redirect to the provider and the
/// callback, HTTP-only and scoped to the callback path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Cookie name.
    pub name: String,

    /// Cookie path; restricts the cookie to the callback endpoint.
    pub path: String,

    /// Cookie lifetime. Short: it only needs to survive one round trip
    /// through the provider.
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,

    /// Whether to set the `Secure` attribute. Disable for local HTTP
    /// development only.
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "oauth2_auth_request".to_string(),
            path: "/login/oauth2".to_string(),
            max_age: Duration::from_secs(180),
            secure: true,
        }
    }
}

/// External identity provider registrations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Google (OIDC) client registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<ProviderConfig>,

    /// GitHub (plain OAuth2) client registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<ProviderConfig>,
}

/// A single provider client registration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// OAuth client ID registered with the provider.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// The provider's authorization endpoint.
    pub authorization_endpoint: Url,

    /// The provider's token endpoint.
    pub token_endpoint: Url,

    /// The provider's user profile endpoint.
    pub userinfo_endpoint: Url,

    /// OAuth scopes to request.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    /// Creates a registration with the required fields.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authorization_endpoint: Url,
        token_endpoint: Url,
        userinfo_endpoint: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorization_endpoint,
            token_endpoint,
            userinfo_endpoint,
            scopes: Vec::new(),
        }
    }

    /// Sets the OAuth scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing configuration value: {0}")]
    MissingValue(String),
}
