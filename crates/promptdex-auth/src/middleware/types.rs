//! Authenticated request context.

use uuid::Uuid;

use crate::storage::{Principal, roles};

/// Context for an authenticated request.
///
/// Built per request from a validated bearer token plus the stored
/// principal; carries exactly what the business layer consumes (identity
/// and coarse roles), nothing about how the token was issued.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Principal's unique identifier.
    pub id: Uuid,

    /// Principal's username (the token subject).
    pub username: String,

    /// Principal's email.
    pub email: String,

    /// Granted role tags.
    pub roles: Vec<String>,
}

impl AuthContext {
    /// Returns `true` if the context carries a specific role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns `true` if the context carries the `ADMIN` role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(roles::ADMIN)
    }
}

impl From<Principal> for AuthContext {
    fn from(principal: Principal) -> Self {
        Self {
            id: principal.id,
            username: principal.username,
            email: principal.email,
            roles: principal.roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AuthProvider;

    #[test]
    fn test_context_from_principal() {
        let principal = Principal::builder("admin", "admin@x.com", AuthProvider::Local)
            .add_role(roles::ADMIN)
            .build();
        let context = AuthContext::from(principal.clone());

        assert_eq!(context.id, principal.id);
        assert_eq!(context.username, "admin");
        assert!(context.has_role(roles::USER));
        assert!(context.is_admin());
    }

    #[test]
    fn test_non_admin_context() {
        let context = AuthContext::from(Principal::new("bob", "bob@x.com", AuthProvider::Github));

        assert!(context.has_role(roles::USER));
        assert!(!context.is_admin());
    }
}
