//! # API REST
//!
//! REST API for the front desk.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status mapping)
//!
//! Business logic lives in `frontdesk-core`; this crate only adapts it to HTTP.

#![warn(rust_2018_idioms)]

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{router, ApiDoc};
pub use state::AppState;

/// Environment variable naming the REST listen address.
pub const REST_ADDR_ENV: &str = "FRONTDESK_REST_ADDR";
/// Listen address used when [`REST_ADDR_ENV`] is unset.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";
