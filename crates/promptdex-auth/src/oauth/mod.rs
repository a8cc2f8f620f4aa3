//! Federated login plumbing: PKCE, the transient authorization-request
//! cookie, and the provider-facing HTTP client.

mod client;
mod pkce;
mod request;

pub use client::ProviderRegistry;
pub use pkce::{PkceChallenge, PkceVerifier};
pub use request::{AuthorizationRequestStore, PendingAuthorization, generate_state};
