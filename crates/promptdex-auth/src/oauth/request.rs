//! Transient authorization request state.
//!
//! There is no server-side session, so the pending OAuth2 authorization
//! request (state and PKCE verifier) travels in a client-held cookie
//! between the redirect to the provider and the callback. The cookie is
//! HTTP-only, scoped to the callback path, short-lived, and single-use:
//! the callback reads it once and always answers with a removal cookie,
//! success or not.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::CookieConfig;
use crate::storage::AuthProvider;

/// A pending authorization request awaiting the provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    /// The provider the user was sent to.
    pub provider: AuthProvider,

    /// CSRF state parameter; must match the callback query.
    pub state: String,

    /// PKCE verifier for the token exchange.
    pub pkce_verifier: String,

    /// When the request was initiated.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl PendingAuthorization {
    /// Creates a pending request stamped with the current time.
    #[must_use]
    pub fn new(
        provider: AuthProvider,
        state: impl Into<String>,
        pkce_verifier: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            state: state.into(),
            pkce_verifier: pkce_verifier.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Generates the OAuth `state` parameter: 256 bits of randomness,
/// base64url-encoded.
#[must_use]
pub fn generate_state() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Serializes pending authorization requests into the transient cookie
/// and back.
#[derive(Debug, Clone)]
pub struct AuthorizationRequestStore {
    config: CookieConfig,
}

impl AuthorizationRequestStore {
    /// Creates a store with the given cookie configuration.
    #[must_use]
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    /// Builds the cookie carrying a pending request.
    #[must_use]
    pub fn save(&self, pending: &PendingAuthorization) -> Cookie<'static> {
        let json = serde_json::to_vec(pending).expect("PendingAuthorization serializes");
        let value = URL_SAFE_NO_PAD.encode(json);

        Cookie::build((self.config.name.clone(), value))
            .path(self.config.path.clone())
            .http_only(true)
            .secure(self.config.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.config.max_age.as_secs() as i64))
            .build()
    }

    /// Reads a pending request back from a cookie value.
    ///
    /// Returns `None` for a missing, garbled, or expired cookie; the
    /// callback treats all three as an aborted login.
    #[must_use]
    pub fn load(&self, cookie_value: &str) -> Option<PendingAuthorization> {
        let json = URL_SAFE_NO_PAD.decode(cookie_value).ok()?;
        let pending: PendingAuthorization = serde_json::from_slice(&json).ok()?;

        let age = OffsetDateTime::now_utc() - pending.created_at;
        if age > time::Duration::seconds(self.config.max_age.as_secs() as i64) {
            tracing::debug!("Discarding expired authorization request cookie");
            return None;
        }

        Some(pending)
    }

    /// The configured cookie name.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.config.name
    }

    /// Builds the removal cookie that clears the pending request.
    ///
    /// Sent on every callback response regardless of outcome, enforcing
    /// single-use semantics.
    #[must_use]
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.config.name.clone(), ""))
            .path(self.config.path.clone())
            .http_only(true)
            .max_age(time::Duration::ZERO)
            .build()
    }
}
