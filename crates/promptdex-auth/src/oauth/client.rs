//! Provider-facing OAuth2 client.
//!
//! Builds authorization URLs, exchanges authorization codes for access
//! tokens, and fetches user profiles. This is the only external network
//! call in the identity core: it is bounded by a request timeout, and a
//! failure aborts the specific login attempt without corrupting state.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::config::{ProviderConfig, ProvidersConfig};
use crate::error::AuthError;
use crate::identity::ProviderProfile;
use crate::storage::AuthProvider;

use super::pkce::PkceChallenge;

/// Timeout applied to every provider request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Token endpoint success response.
#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

/// Token endpoint error response (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Registered providers plus the HTTP client used to talk to them.
pub struct ProviderRegistry {
    http: reqwest::Client,
    google: Option<ProviderConfig>,
    github: Option<ProviderConfig>,
}

impl ProviderRegistry {
    /// Creates a registry from the configured provider registrations.
    #[must_use]
    pub fn new(providers: ProvidersConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            // GitHub's API rejects requests without a User-Agent.
            .user_agent("promptdex-server")
            .build()
            .expect("HTTP client builds with static configuration");

        Self {
            http,
            google: providers.google,
            github: providers.github,
        }
    }

    /// Looks up the registration for a provider.
    ///
    /// # Errors
    ///
    /// Returns a validation error for providers with no registration.
    pub fn get(&self, provider: AuthProvider) -> Result<&ProviderConfig, AuthError> {
        let config = match provider {
            AuthProvider::Google => self.google.as_ref(),
            AuthProvider::Github => self.github.as_ref(),
            AuthProvider::Local => None,
        };
        config.ok_or_else(|| {
            AuthError::validation(format!("identity provider '{provider}' is not configured"))
        })
    }

    /// Builds the authorization URL the user agent is redirected to.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unconfigured providers.
    pub fn authorization_url(
        &self,
        provider: AuthProvider,
        callback: &Url,
        state: &str,
        challenge: &PkceChallenge,
    ) -> Result<Url, AuthError> {
        let config = self.get(provider)?;
        let mut url = config.authorization_endpoint.clone();

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", callback.as_str())
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("code_challenge", challenge.as_str())
            .append_pair("code_challenge_method", "S256");

        Ok(url)
    }

    /// Exchanges an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError::IdentityProvider`] for transport failures
    /// and provider-reported OAuth errors.
    pub async fn exchange_code(
        &self,
        provider: AuthProvider,
        code: &str,
        callback: &Url,
        pkce_verifier: &str,
    ) -> Result<String, AuthError> {
        let config = self.get(provider)?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", callback.as_str()),
            ("client_id", &config.client_id),
            ("client_secret", &config.client_secret),
            ("code_verifier", pkce_verifier),
        ];

        let response = self
            .http
            .post(config.token_endpoint.clone())
            // GitHub answers with form-encoding unless JSON is requested.
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| provider_error(provider, format!("token exchange failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(&body) {
                return Err(provider_error(
                    provider,
                    format!(
                        "token endpoint returned {}: {}",
                        oauth_error.error,
                        oauth_error.error_description.unwrap_or_default()
                    ),
                ));
            }
            return Err(provider_error(
                provider,
                format!("token endpoint returned HTTP {status}"),
            ));
        }

        let token: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| provider_error(provider, format!("invalid token response: {e}")))?;

        Ok(token.access_token)
    }

    /// Fetches the user's profile attributes from the provider.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError::IdentityProvider`] for transport failures
    /// and non-success responses.
    pub async fn fetch_profile(
        &self,
        provider: AuthProvider,
        access_token: &str,
    ) -> Result<ProviderProfile, AuthError> {
        let config = self.get(provider)?;

        let response = self
            .http
            .get(config.userinfo_endpoint.clone())
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| provider_error(provider, format!("profile fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(provider_error(
                provider,
                format!("userinfo endpoint returned HTTP {}", response.status()),
            ));
        }

        let attributes: serde_json::Value = response
            .json()
            .await
            .map_err(|e| provider_error(provider, format!("invalid profile response: {e}")))?;

        Ok(ProviderProfile::from_attributes(&attributes))
    }
}

fn provider_error(provider: AuthProvider, message: String) -> AuthError {
    AuthError::identity_provider(provider.as_str(), message)
}
