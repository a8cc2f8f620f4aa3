//! PromptDex API server.
//!
//! Hosts the identity and authentication core from `promptdex-auth`
//! behind an axum router. The prompt/review/collection business routes
//! are mounted by their own modules and consume the authenticated
//! context this server attaches to each request.

pub mod config;
pub mod observability;
pub mod server;

pub use config::{AppConfig, load_config};
pub use server::{build_app, build_app_with_store, run};
