//! Stateless bearer token issuance and validation.
//!
//! Tokens are compact JWTs signed with HS256 over the process-wide
//! symmetric secret. They carry only `{sub, iat, exp}` — the subject is
//! the principal's username — and are never persisted: validity is purely
//! a function of signature and expiry at verification time. There is no
//! refresh mechanism and no revocation state.
//!
//! ## Example
//!
//! ```ignore
//! use promptdex_auth::token::TokenService;
//! use std::time::Duration;
//!
//! let service = TokenService::new(b"0123456789abcdef0123456789abcdef", Duration::from_secs(86_400));
//! let token = service.issue("alice")?;
//! assert!(service.validate(&token));
//! assert_eq!(service.subject_of(&token).as_deref(), Some("alice"));
//! ```

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject: the principal's username.
    pub sub: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// Errors that can occur while issuing a token.
///
/// Validation has no error type on purpose: every failure mode collapses
/// to `validate() == false` so callers cannot leak the sub-reason.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to encode and sign the token.
    #[error("Failed to encode token: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },
}

/// Service for issuing and validating bearer tokens.
///
/// Thread-safe (`Send + Sync`); issuance and validation are pure functions
/// of the immutable key material and the clock, safe under unbounded
/// parallelism.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: time::Duration,
}

impl TokenService {
    /// Creates a token service from the configured symmetric secret.
    ///
    /// The secret is loaded once at startup and never rotated.
    #[must_use]
    pub fn new(secret: &[u8], lifetime: std::time::Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime: time::Duration::seconds_f64(lifetime.as_secs_f64()),
        }
    }

    /// Issues a token for the given subject.
    ///
    /// Embeds `sub = username`, `iat = now`, `exp = now + lifetime`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue(&self, username: &str) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let claims = TokenClaims {
            sub: username.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.lifetime).unix_timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            TokenError::Encoding {
                message: e.to_string(),
            }
        })
    }

    /// Validates a token's signature and expiry.
    ///
    /// Returns `false` uniformly for malformed, mis-signed, and expired
    /// tokens; the sub-reason is not distinguished to the caller.
    #[must_use]
    pub fn validate(&self, token: &str) -> bool {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<TokenClaims>(token, &self.decoding_key, &validation) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Token validation failed");
                false
            }
        }
    }

    /// Extracts the subject claim from a token.
    ///
    /// Does not re-verify the signature or expiry: callers must call
    /// [`TokenService::validate`] first. Returns `None` only when the
    /// token cannot be parsed at all.
    #[must_use]
    pub fn subject_of(&self, token: &str) -> Option<String> {
        use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return None;
        }

        let payload = URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
        let claims: TokenClaims = serde_json::from_slice(&payload).ok()?;
        Some(claims.sub)
    }
}
