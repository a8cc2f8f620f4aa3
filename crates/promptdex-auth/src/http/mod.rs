//! Axum HTTP handlers for the auth endpoints.

mod auth;
mod oauth;

pub use auth::{
    AuthResponse, LoginRequest, MeResponse, RegisterRequest, login_handler, me_handler,
    register_handler,
};
pub use oauth::{CallbackParams, authorize_handler, callback_handler};
