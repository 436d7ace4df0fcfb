//! # megamon-api
//!
//! HTTP API layer for Mega Monitor's extension platform built on Axum.
//!
//! Two route families: the admin surface under `/api/extensions`, and the
//! dynamic dispatch path under `/extensions/{name}` where enabled
//! extensions' backend routes are served.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
