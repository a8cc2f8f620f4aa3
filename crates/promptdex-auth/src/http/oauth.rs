//! Federated login endpoints.
//!
//! Two handlers cover the full provider round trip:
//!
//! - `GET /oauth2/authorize/{provider}` — start: stash the pending
//!   request (state + PKCE verifier) in the transient cookie and redirect
//!   the user agent to the provider.
//! - `GET /login/oauth2/code/{provider}` — finish: consume the cookie
//!   (single-use, cleared on every outcome), verify the state, exchange
//!   the code, resolve the principal, mint a token, and redirect to the
//!   first allow-listed frontend URI with `?token=…`. The target is taken
//!   from configuration only, never from request data.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use url::Url;

use crate::error::AuthError;
use crate::middleware::AuthState;
use crate::oauth::{PendingAuthorization, PkceChallenge, PkceVerifier, generate_state};
use crate::storage::AuthProvider;

/// Query parameters of the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    /// Authorization code, present on success.
    #[serde(default)]
    pub code: Option<String>,

    /// Echoed state parameter.
    #[serde(default)]
    pub state: Option<String>,

    /// Provider-reported error code, present on denial.
    #[serde(default)]
    pub error: Option<String>,
}

/// Handles `GET /oauth2/authorize/{provider}`.
///
/// # Errors
///
/// Responds 400 for unknown or unconfigured providers.
pub async fn authorize_handler(
    State(state): State<AuthState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), AuthError> {
    let provider = parse_provider(&provider)?;
    let callback = callback_url(&state, provider)?;

    let verifier = PkceVerifier::generate();
    let challenge = PkceChallenge::from_verifier(&verifier);
    let oauth_state = generate_state();

    let url = state
        .providers
        .authorization_url(provider, &callback, &oauth_state, &challenge)?;

    let pending = PendingAuthorization::new(provider, oauth_state, verifier.as_str());
    let jar = jar.add(state.request_store.save(&pending));

    tracing::debug!(provider = %provider, "Redirecting to identity provider");
    Ok((jar, found(&url)))
}

/// Handles `GET /login/oauth2/code/{provider}`.
///
/// The transient cookie is read once and cleared in the response
/// regardless of outcome.
pub async fn callback_handler(
    State(state): State<AuthState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> (CookieJar, Response) {
    let pending = jar
        .get(state.request_store.cookie_name())
        .and_then(|cookie| state.request_store.load(cookie.value()));
    let jar = jar.remove(state.request_store.removal_cookie());

    let response = match complete_login(&state, &provider, &params, pending).await {
        Ok(target) => found(&target),
        Err(err) => err.into_response(),
    };

    (jar, response)
}

/// Runs the callback pipeline up to the success redirect target.
async fn complete_login(
    state: &AuthState,
    provider: &str,
    params: &CallbackParams,
    pending: Option<PendingAuthorization>,
) -> Result<Url, AuthError> {
    let provider = parse_provider(provider)?;

    if let Some(error) = &params.error {
        return Err(AuthError::identity_provider(
            provider.as_str(),
            format!("authorization denied: {error}"),
        ));
    }

    let code = params
        .code
        .as_deref()
        .ok_or_else(|| AuthError::validation("missing authorization code"))?;
    let returned_state = params
        .state
        .as_deref()
        .ok_or_else(|| AuthError::validation("missing state parameter"))?;

    let pending =
        pending.ok_or_else(|| AuthError::unauthorized("No pending authorization request"))?;
    if pending.provider != provider || pending.state != returned_state {
        return Err(AuthError::unauthorized("Authorization state mismatch"));
    }
    let verifier = PkceVerifier::parse(&pending.pkce_verifier)
        .ok_or_else(|| AuthError::unauthorized("Authorization state mismatch"))?;

    let callback = callback_url(state, provider)?;
    let access_token = state
        .providers
        .exchange_code(provider, code, &callback, verifier.as_str())
        .await?;
    let profile = state.providers.fetch_profile(provider, &access_token).await?;

    let principal = state.resolver.resolve_federated(provider, &profile).await?;
    let token = state
        .token_service
        .issue(&principal.username)
        .map_err(|e| AuthError::internal(e.to_string()))?;

    // The target comes from the configured allow-list only.
    let mut target = state
        .config
        .redirect
        .target()
        .cloned()
        .ok_or_else(|| AuthError::configuration("no authorized redirect URI configured"))?;
    target.query_pairs_mut().append_pair("token", &token);

    tracing::info!(
        username = %principal.username,
        provider = %provider,
        "Federated login succeeded"
    );
    Ok(target)
}

fn parse_provider(segment: &str) -> Result<AuthProvider, AuthError> {
    AuthProvider::from_path_segment(segment)
        .ok_or_else(|| AuthError::validation(format!("unknown identity provider '{segment}'")))
}

fn callback_url(state: &AuthState, provider: AuthProvider) -> Result<Url, AuthError> {
    state
        .config
        .callback_url(provider.as_str())
        .map_err(|e| AuthError::configuration(e.to_string()))
}

/// Builds a `302 Found` redirect.
fn found(url: &Url) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}
