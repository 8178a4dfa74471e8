//! Tubely API Library
//!
//! This crate provides the HTTP handlers, authentication middleware and
//! application setup for the Tubely upload service.

pub mod auth;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
