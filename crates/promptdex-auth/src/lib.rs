//! # promptdex-auth
//!
//! Identity and authentication core for the PromptDex server.
//!
//! Unifies three identity origins — local password credentials, Google
//! (OIDC), and GitHub (plain OAuth2) — into a single authenticated
//! principal, issues and validates stateless signed bearer tokens, and
//! provisions new accounts with guaranteed-unique usernames under
//! concurrent registration. Everything else (prompt/review/collection
//! CRUD, statistics) lives outside this crate and only consumes the
//! resolved principal.
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration
//! - [`token`] - Stateless bearer token issuance and validation
//! - [`password`] - Argon2 credential hashing
//! - [`storage`] - Principal model and store
//! - [`identity`] - Profile normalization, provisioning, local credentials
//! - [`oauth`] - PKCE, transient authorization cookie, provider client
//! - [`middleware`] - Extractors, security gate, error responses
//! - [`http`] - Axum handlers for the auth endpoints

pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod middleware;
pub mod oauth;
pub mod password;
pub mod storage;
pub mod token;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ConflictField};
pub use identity::{IdentityResolver, ProviderProfile};
pub use middleware::{
    AdminAuth, AuthContext, AuthState, BearerAuth, OptionalBearerAuth, RoutePolicy, security_gate,
};
pub use storage::{AuthProvider, MemoryPrincipalStore, Principal, PrincipalStore};
pub use token::TokenService;

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;
