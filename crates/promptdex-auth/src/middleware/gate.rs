//! Per-request security gate.
//!
//! Applied once to every incoming request: extracts and validates the
//! bearer token, attaches the authenticated context to the request, and
//! enforces the route-level policy — a fixed anonymous allow-list of
//! read-only browse routes, authentication everywhere else, and the
//! `ADMIN` role under the admin prefix. Ownership checks are not enforced
//! here; the business layer performs them against the attached context.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use crate::error::AuthError;

use super::auth::{AuthState, authenticate};

/// Route-level authorization rules.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    /// Exact paths open to anonymous requests with any method.
    anonymous_paths: Vec<String>,

    /// Path prefixes open to anonymous requests with any method
    /// (the federated login endpoints).
    anonymous_prefixes: Vec<String>,

    /// Path prefixes open to anonymous read-only (GET/HEAD) requests.
    browse_prefixes: Vec<String>,

    /// Prefix that additionally requires the `ADMIN` role.
    admin_prefix: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            anonymous_paths: vec![
                "/healthz".to_string(),
                "/api/auth/login".to_string(),
                "/api/auth/register".to_string(),
            ],
            anonymous_prefixes: vec!["/oauth2".to_string(), "/login/oauth2".to_string()],
            browse_prefixes: vec!["/api/prompts".to_string()],
            admin_prefix: "/api/admin".to_string(),
        }
    }
}

/// Matches `path` against `prefix` on path-segment boundaries.
fn prefix_match(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl RoutePolicy {
    /// Returns `true` if the route is reachable without authentication.
    #[must_use]
    pub fn allows_anonymous(&self, method: &Method, path: &str) -> bool {
        if self.requires_admin(path) {
            return false;
        }
        if self.anonymous_paths.iter().any(|p| p == path) {
            return true;
        }
        if self
            .anonymous_prefixes
            .iter()
            .any(|p| prefix_match(path, p))
        {
            return true;
        }
        (method == Method::GET || method == Method::HEAD)
            && self.browse_prefixes.iter().any(|p| prefix_match(path, p))
    }

    /// Returns `true` if the route requires the `ADMIN` role.
    #[must_use]
    pub fn requires_admin(&self, path: &str) -> bool {
        prefix_match(path, &self.admin_prefix)
    }
}

/// The security gate middleware.
///
/// Install with `axum::middleware::from_fn_with_state(auth_state,
/// security_gate)`. On success the request carries an
/// [`super::AuthContext`] extension when the caller is authenticated.
///
/// # Errors
///
/// Responds 401 for missing/invalid credentials on protected routes and
/// 403 for authenticated callers without the required role.
pub async fn security_gate(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let context = match authenticate(&state, request.headers()).await {
        Ok(context) => context,
        // A bad token does not block routes that never needed one.
        Err(err) if state.policy.allows_anonymous(&method, &path) => {
            tracing::debug!(%path, error = %err, "Ignoring invalid token on anonymous route");
            None
        }
        Err(err) => return Err(err),
    };

    if state.policy.requires_admin(&path) {
        match &context {
            Some(context) if context.is_admin() => {}
            Some(_) => return Err(AuthError::forbidden("Admin access required")),
            None => return Err(AuthError::unauthorized("Authentication required")),
        }
    } else if context.is_none() && !state.policy.allows_anonymous(&method, &path) {
        return Err(AuthError::unauthorized("Authentication required"));
    }

    if let Some(context) = context {
        request.extensions_mut().insert(context);
    }

    Ok(next.run(request).await)
}
