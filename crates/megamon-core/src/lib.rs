//! # megamon-core
//!
//! Shared foundation for the Mega Monitor extension platform:
//!
//! - Unified error type ([`error::AppError`]) and result alias
//! - TOML configuration schemas loaded via the `config` crate
//! - Domain events and the broadcast event bus

pub mod config;
pub mod error;
pub mod events;
pub mod result;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
