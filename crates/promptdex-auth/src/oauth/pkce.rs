//! PKCE (Proof Key for Code Exchange), RFC 7636, S256 only.
//!
//! This server is the *client* side of the exchange: it generates the
//! verifier/challenge pair when redirecting to the provider, carries the
//! verifier in the transient authorization cookie, and presents it at the
//! token endpoint.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// PKCE code verifier: 32 random bytes, base64url (43 characters).
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Generates a cryptographically random verifier.
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        let bytes: [u8; 32] = rand::thread_rng().r#gen();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wraps a verifier read back from the authorization cookie.
    ///
    /// Returns `None` if the value is outside the RFC 7636 shape
    /// (43-128 chars of `[A-Za-z0-9-._~]`).
    #[must_use]
    pub fn parse(verifier: &str) -> Option<Self> {
        let valid_len = (43..=128).contains(&verifier.len());
        let valid_chars = verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'));
        (valid_len && valid_chars).then(|| Self(verifier.to_string()))
    }

    /// Returns the verifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// PKCE code challenge: `BASE64URL(SHA256(ASCII(code_verifier)))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Computes the S256 challenge for a verifier.
    #[must_use]
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(verifier.0.as_bytes());
        Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    /// Returns the challenge string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
