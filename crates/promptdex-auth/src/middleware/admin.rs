//! Admin authentication extractor.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::error::AuthError;
use crate::storage::roles;

use super::auth::{AuthState, BearerAuth};
use super::types::AuthContext;

/// Extractor that requires a valid bearer token *and* the `ADMIN` role.
///
/// # Example
///
/// ```ignore
/// async fn admin_handler(AdminAuth(ctx): AdminAuth) -> String {
///     format!("Hello admin {}", ctx.username)
/// }
/// ```
pub struct AdminAuth(pub AuthContext);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerAuth(context) = BearerAuth::from_request_parts(parts, state).await?;

        if !context.has_role(roles::ADMIN) {
            tracing::debug!(
                username = %context.username,
                roles = ?context.roles,
                "Admin access denied: missing role"
            );
            return Err(AuthError::forbidden("Admin access required"));
        }

        Ok(Self(context))
    }
}
