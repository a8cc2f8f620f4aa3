//! Principal persistence: the model, the store trait, and the in-memory
//! implementation.
//!
//! The store is the only shared mutable resource in the identity core.
//! Its unique constraints on username and email are the authoritative
//! collision detectors for concurrent provisioning; see
//! [`crate::identity::IdentityResolver`] for the retry protocol.

mod memory;
mod principal;

pub use memory::MemoryPrincipalStore;
pub use principal::{
    AuthProvider, Principal, PrincipalBuilder, PrincipalStore, StoreError, StoreResult,
    UniqueField, roles,
};
