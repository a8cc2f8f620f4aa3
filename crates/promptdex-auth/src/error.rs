//! Authentication and authorization error types.
//!
//! This module defines the error taxonomy used across the identity core.
//! Variants are deliberately coarse towards the client: credential and
//! token failures never disclose which check failed, and backend detail
//! is logged server-side only (see [`crate::middleware`] for the HTTP
//! mapping).

use std::fmt;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The supplied username/password pair did not match a stored local
    /// credential. Carries no message on purpose: the client always sees
    /// the same generic text regardless of which field was wrong.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Registration collided with an existing username or email.
    #[error("Registration conflict: {field}")]
    RegistrationConflict {
        /// Which unique field collided.
        field: ConflictField,
    },

    /// Request input failed validation (blank field, malformed email).
    #[error("Validation failed: {message}")]
    Validation {
        /// Description of the failed constraint.
        message: String,
    },

    /// A federated profile was missing attributes required to resolve a
    /// principal (e.g. no email and no way to synthesize one).
    #[error("Authentication processing failed: {message}")]
    Processing {
        /// Description of the missing attribute. Logged, never sent to
        /// the client verbatim.
        message: String,
    },

    /// The request lacks valid authentication credentials. Expired,
    /// malformed, and mis-signed tokens all collapse into this variant.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthenticated.
        message: String,
    },

    /// The authenticated principal lacks the required role.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The external identity provider failed or returned an error.
    #[error("Identity provider error: {provider} - {message}")]
    IdentityProvider {
        /// The identity provider name.
        provider: String,
        /// Description of the error.
        message: String,
    },

    /// An error occurred while reading or writing the identity store.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

/// The unique principal field a registration collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictField {
    /// The username is already taken.
    Username,
    /// The email is already in use.
    Email,
}

impl ConflictField {
    /// Returns the client-facing conflict message for this field.
    ///
    /// Mirrors the registration error texts of the original API: specific
    /// enough to act on, without echoing the submitted value back.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Username => "Username is already taken",
            Self::Email => "Email is already in use",
        }
    }
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => write!(f, "username"),
            Self::Email => write!(f, "email"),
        }
    }
}

impl AuthError {
    /// Creates a new `RegistrationConflict` error.
    #[must_use]
    pub fn conflict(field: ConflictField) -> Self {
        Self::RegistrationConflict { field }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `Processing` error.
    #[must_use]
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `IdentityProvider` error.
    #[must_use]
    pub fn identity_provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IdentityProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::RegistrationConflict { .. }
                | Self::Validation { .. }
                | Self::Processing { .. }
                | Self::Unauthorized { .. }
                | Self::Forbidden { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::IdentityProvider { .. }
                | Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this error must reach the client as a bare
    /// "unauthenticated" response (token and credential failures).
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::Processing { .. } | Self::Unauthorized { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
        assert_eq!(
            AuthError::conflict(ConflictField::Username).to_string(),
            "Registration conflict: username"
        );
        assert_eq!(
            AuthError::identity_provider("github", "connection refused").to_string(),
            "Identity provider error: github - connection refused"
        );
    }

    #[test]
    fn test_conflict_messages() {
        assert_eq!(
            ConflictField::Username.message(),
            "Username is already taken"
        );
        assert_eq!(ConflictField::Email.message(), "Email is already in use");
    }

    #[test]
    fn test_error_predicates() {
        assert!(AuthError::InvalidCredentials.is_client_error());
        assert!(AuthError::InvalidCredentials.is_authentication_error());
        assert!(!AuthError::InvalidCredentials.is_server_error());

        assert!(AuthError::forbidden("no access").is_client_error());
        assert!(!AuthError::forbidden("no access").is_authentication_error());

        assert!(AuthError::storage("database down").is_server_error());
        assert!(!AuthError::storage("database down").is_client_error());

        assert!(AuthError::identity_provider("google", "timeout").is_server_error());
    }
}
