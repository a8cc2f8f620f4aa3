//! Bearer token authentication: shared state and extractors.
//!
//! [`AuthState`] bundles everything a request needs to prove identity:
//! the token service, the principal store, the resolver, the provider
//! registry, and the transient cookie store. Handlers receive it via
//! axum's `FromRef` state plumbing.
//!
//! # Example
//!
//! ```ignore
//! use promptdex_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn protected_handler(BearerAuth(ctx): BearerAuth) -> String {
//!     format!("Hello, {}!", ctx.username)
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::config::{AuthConfig, ConfigError};
use crate::error::AuthError;
use crate::identity::IdentityResolver;
use crate::oauth::{AuthorizationRequestStore, ProviderRegistry};
use crate::storage::PrincipalStore;
use crate::token::TokenService;

use super::gate::RoutePolicy;
use super::types::AuthContext;

// =============================================================================
// Auth State
// =============================================================================

/// State required for authentication across the request pipeline.
#[derive(Clone)]
pub struct AuthState {
    /// Token issuance and validation.
    pub token_service: Arc<TokenService>,

    /// Principal persistence.
    pub store: Arc<dyn PrincipalStore>,

    /// Identity resolution and provisioning.
    pub resolver: Arc<IdentityResolver>,

    /// Registered external providers.
    pub providers: Arc<ProviderRegistry>,

    /// Transient authorization-request cookie store.
    pub request_store: AuthorizationRequestStore,

    /// Route-level authorization policy.
    pub policy: Arc<RoutePolicy>,

    /// The validated auth configuration.
    pub config: Arc<AuthConfig>,
}

impl AuthState {
    /// Builds the auth state from validated configuration and a store.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration fails validation.
    pub fn from_config(
        config: AuthConfig,
        store: Arc<dyn PrincipalStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let token_service = Arc::new(TokenService::new(
            config.token.secret.as_bytes(),
            config.token.lifetime,
        ));
        let resolver = Arc::new(IdentityResolver::new(Arc::clone(&store)));
        let providers = Arc::new(ProviderRegistry::new(config.providers.clone()));
        let request_store = AuthorizationRequestStore::new(config.cookie.clone());

        Ok(Self {
            token_service,
            store,
            resolver,
            providers,
            request_store,
            policy: Arc::new(RoutePolicy::default()),
            config: Arc::new(config),
        })
    }

    /// Replaces the route policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }
}

// =============================================================================
// Token Extraction
// =============================================================================

/// Pulls the bearer token out of the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authenticates a request from its headers.
///
/// - No bearer token → `Ok(None)` (anonymous; absence is not an error).
/// - Present but invalid (malformed, mis-signed, expired, unknown
///   subject) → a uniform `Unauthorized` error, sub-reason logged only.
/// - Valid → `Ok(Some(context))` with the principal's roles.
pub(crate) async fn authenticate(
    state: &AuthState,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, AuthError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };

    if !state.token_service.validate(token) {
        return Err(AuthError::unauthorized("Invalid or expired bearer token"));
    }

    // Contract: subject_of is only called after validate succeeded.
    let Some(username) = state.token_service.subject_of(token) else {
        return Err(AuthError::unauthorized("Invalid or expired bearer token"));
    };

    let principal = state
        .store
        .find_by_username(&username)
        .await
        .map_err(|e| AuthError::storage(e.to_string()))?;

    match principal {
        Some(principal) => {
            tracing::debug!(username = %principal.username, "Bearer token validated");
            Ok(Some(AuthContext::from(principal)))
        }
        None => {
            // Token outlived its principal.
            tracing::debug!(subject = %username, "Token subject has no stored principal");
            Err(AuthError::unauthorized("Invalid or expired bearer token"))
        }
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Extractor that requires a valid bearer token.
pub struct BearerAuth(pub AuthContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        match authenticate(&auth_state, &parts.headers).await? {
            Some(context) => Ok(Self(context)),
            None => Err(AuthError::unauthorized("Missing bearer token")),
        }
    }
}

/// Extractor that accepts anonymous requests.
///
/// Yields `None` when no token is presented; an invalid token is still an
/// error.
pub struct OptionalBearerAuth(pub Option<AuthContext>);

impl<S> FromRequestParts<S> for OptionalBearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        authenticate(&auth_state, &parts.headers).await.map(Self)
    }
}
