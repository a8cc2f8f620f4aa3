//! HTTP responses for authentication errors.
//!
//! Maps [`AuthError`] onto the API's error body
//! `{status, message, timestamp}`. Client-facing messages are fixed per
//! variant: credential and token failures stay generic, and backend
//! detail is logged server-side but never serialized into the response.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use time::format_description::well_known::Rfc3339;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = error_details(&self);

        if self.is_server_error() {
            tracing::error!(error = %self, "Request failed with server error");
        } else {
            tracing::debug!(error = %self, status = %status.as_u16(), "Request rejected");
        }

        let timestamp = time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let body = json!({
            "status": status.as_u16(),
            "message": message,
            "timestamp": timestamp,
        });

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"promptdex\""),
            );
        }

        (status, headers, Json(body)).into_response()
    }
}

/// Maps an error to its HTTP status and client-facing message.
fn error_details(error: &AuthError) -> (StatusCode, String) {
    match error {
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "Invalid username or password".to_string(),
        ),
        AuthError::RegistrationConflict { field } => {
            (StatusCode::CONFLICT, field.message().to_string())
        }
        AuthError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
        // Which attribute was missing is an implementation detail of the
        // provider; the user just sees a failed login.
        AuthError::Processing { .. } => {
            (StatusCode::UNAUTHORIZED, "Authentication failed".to_string())
        }
        AuthError::Unauthorized { message } => (StatusCode::UNAUTHORIZED, message.clone()),
        AuthError::Forbidden { message } => (StatusCode::FORBIDDEN, message.clone()),
        AuthError::IdentityProvider { .. } => (
            StatusCode::BAD_GATEWAY,
            "Authentication with the identity provider failed".to_string(),
        ),
        AuthError::Storage { .. } | AuthError::Configuration { .. } | AuthError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "An internal server error occurred. Please try again later.".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConflictField;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_credentials_response() {
        let response = AuthError::InvalidCredentials.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"promptdex\""
        );

        let body = body_json(response).await;
        assert_eq!(body["status"], 401);
        assert_eq!(body["message"], "Invalid username or password");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_conflict_response() {
        let response = AuthError::conflict(ConflictField::Email).into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Email is already in use");
    }

    #[tokio::test]
    async fn test_forbidden_has_no_www_authenticate() {
        let response = AuthError::forbidden("Admin access required").into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_server_errors_are_scrubbed() {
        let response =
            AuthError::storage("connection refused to db.internal:5432").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "An internal server error occurred. Please try again later."
        );
    }

    #[tokio::test]
    async fn test_processing_error_is_generic() {
        let response =
            AuthError::processing("email claim missing from google profile").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Authentication failed");
    }

    #[tokio::test]
    async fn test_provider_error_is_bad_gateway_and_scrubbed() {
        let response = AuthError::identity_provider("github", "HTTP 500 from token endpoint")
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "Authentication with the identity provider failed"
        );
    }
}
