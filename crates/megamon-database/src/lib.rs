//! # megamon-database
//!
//! PostgreSQL connection management and the concrete store
//! implementations behind the extension subsystem's registry traits.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{ExtensionRepository, LocalePackRepository, SchemaRepository};
