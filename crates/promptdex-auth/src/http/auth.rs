//! Local credential endpoints: login, registration, and identity.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use crate::middleware::{AuthState, BearerAuth};

/// `POST /api/auth/login` request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email of the account.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// `POST /api/auth/register` request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Desired username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The signed bearer token.
    pub token: String,
    /// The authenticated username.
    pub username: String,
}

/// `GET /api/auth/me` response.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Principal ID.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Granted roles.
    pub roles: Vec<String>,
}

/// Handles `POST /api/auth/login`.
///
/// # Errors
///
/// Responds 401 with a generic message for any credential failure.
pub async fn login_handler(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let principal = state
        .resolver
        .authenticate_local(&request.username, &request.password)
        .await?;

    let token = state
        .token_service
        .issue(&principal.username)
        .map_err(|e| AuthError::internal(e.to_string()))?;

    tracing::info!(username = %principal.username, "Local login succeeded");

    Ok(Json(AuthResponse {
        token,
        username: principal.username,
    }))
}

/// Handles `POST /api/auth/register`.
///
/// # Errors
///
/// Responds 400 for invalid input and 409 for duplicate username/email.
pub async fn register_handler(
    State(state): State<AuthState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AuthError> {
    state
        .resolver
        .register_local(&request.username, &request.email, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "User registered successfully" })),
    ))
}

/// Handles `GET /api/auth/me`.
pub async fn me_handler(BearerAuth(context): BearerAuth) -> Json<MeResponse> {
    Json(MeResponse {
        id: context.id,
        username: context.username,
        email: context.email,
        roles: context.roles,
    })
}
