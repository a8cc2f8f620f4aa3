//! Principal model and storage trait.
//!
//! A [`Principal`] is the identity record behind every authenticated
//! request, regardless of which of the three origins created it: local
//! registration, Google (OIDC), or GitHub (plain OAuth2). The variants
//! are distinguished by which optional fields are populated — federated
//! principals carry no password hash — rather than by separate types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Role tags assigned to principals.
pub mod roles {
    /// Default role granted to every principal on creation.
    pub const USER: &str = "USER";

    /// Administrative role, required for routes under the admin prefix.
    pub const ADMIN: &str = "ADMIN";
}

/// The identity origin of a principal.
///
/// Set once at creation and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Local username/password credentials.
    Local,
    /// Google, via OpenID Connect.
    Google,
    /// GitHub, via plain OAuth2 (no ID token, email often withheld).
    Github,
}

impl AuthProvider {
    /// Parses the provider from a URL path segment.
    #[must_use]
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "google" => Some(Self::Google),
            "github" => Some(Self::Github),
            _ => None,
        }
    }

    /// Returns the provider's path-segment / log identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated identity record backing a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Unique identifier.
    pub id: Uuid,

    /// Username. Globally unique, immutable after creation.
    pub username: String,

    /// Email address. Globally unique; synthesized for GitHub accounts
    /// that withhold theirs.
    pub email: String,

    /// Argon2 password hash. `None` for federated principals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    /// Identity origin.
    pub provider: AuthProvider,

    /// Role tags. Never empty: `USER` is assigned on creation.
    pub roles: Vec<String>,

    /// When the principal was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the principal was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Principal {
    /// Creates a principal with the default `USER` role.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        provider: AuthProvider,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: None,
            provider,
            roles: vec![roles::USER.to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a new principal builder.
    #[must_use]
    pub fn builder(
        username: impl Into<String>,
        email: impl Into<String>,
        provider: AuthProvider,
    ) -> PrincipalBuilder {
        PrincipalBuilder {
            principal: Self::new(username, email, provider),
        }
    }

    /// Returns `true` if the principal has a specific role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns `true` if this is a local-credential account.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.provider == AuthProvider::Local
    }
}

/// Builder for [`Principal`] instances.
pub struct PrincipalBuilder {
    principal: Principal,
}

impl PrincipalBuilder {
    /// Sets the password hash.
    #[must_use]
    pub fn password_hash(mut self, hash: impl Into<String>) -> Self {
        self.principal.password_hash = Some(hash.into());
        self
    }

    /// Replaces the role set.
    #[must_use]
    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.principal.roles = roles;
        self
    }

    /// Adds a role.
    #[must_use]
    pub fn add_role(mut self, role: impl Into<String>) -> Self {
        self.principal.roles.push(role.into());
        self
    }

    /// Builds the principal.
    #[must_use]
    pub fn build(self) -> Principal {
        self.principal
    }
}

// =============================================================================
// Store Trait
// =============================================================================

/// The unique field an insert collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueField {
    /// `username` uniqueness was violated.
    Username,
    /// `email` uniqueness was violated.
    Email,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Username => write!(f, "username"),
            Self::Email => write!(f, "email"),
        }
    }
}

/// Errors raised by a principal store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An insert violated a unique constraint. For provisioning this is a
    /// retry signal, not a fatal error: the constraint — not any prior
    /// existence probe — is the authoritative collision detector.
    #[error("unique constraint violated on {0}")]
    UniqueViolation(UniqueField),

    /// The backing store failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operations for principals.
///
/// Implementations must enforce username and email uniqueness as hard
/// constraints inside [`PrincipalStore::create`]; callers treat
/// [`StoreError::UniqueViolation`] as the authoritative collision signal
/// under concurrent provisioning.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Find a principal by ID. Returns `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Principal>>;

    /// Find a principal by username. Returns `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Principal>>;

    /// Find a principal by email. Returns `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Principal>>;

    /// Advisory existence probe for a username.
    ///
    /// Used to pick collision suffixes cheaply; a `false` here does not
    /// guarantee a later insert will succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn exists_username(&self, username: &str) -> StoreResult<bool>;

    /// Insert a new principal, enforcing the unique constraints.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] when the username or email
    /// is already taken, leaving the store unchanged.
    async fn create(&self, principal: &Principal) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_principal_defaults() {
        let principal = Principal::new("alice", "alice@x.com", AuthProvider::Local);

        assert_eq!(principal.username, "alice");
        assert_eq!(principal.email, "alice@x.com");
        assert_eq!(principal.roles, vec![roles::USER]);
        assert!(principal.password_hash.is_none());
        assert!(principal.is_local());
    }

    #[test]
    fn test_builder() {
        let principal = Principal::builder("admin", "admin@x.com", AuthProvider::Local)
            .password_hash("$argon2id$...")
            .add_role(roles::ADMIN)
            .build();

        assert!(principal.has_role(roles::USER));
        assert!(principal.has_role(roles::ADMIN));
        assert!(principal.password_hash.is_some());
    }

    #[test]
    fn test_provider_path_segments() {
        assert_eq!(
            AuthProvider::from_path_segment("google"),
            Some(AuthProvider::Google)
        );
        assert_eq!(
            AuthProvider::from_path_segment("github"),
            Some(AuthProvider::Github)
        );
        // The local origin is not a federated login target.
        assert_eq!(AuthProvider::from_path_segment("local"), None);
        assert_eq!(AuthProvider::from_path_segment("gitlab"), None);
    }

    #[test]
    fn test_principal_serialization_skips_missing_hash() {
        let federated = Principal::new("bob", "bob@x.com", AuthProvider::Github);
        let json = serde_json::to_value(&federated).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["provider"], "github");
    }
}
