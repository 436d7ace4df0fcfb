//! Store implementations backing the extension subsystem.

pub mod extension;
pub mod locale;
pub mod schema;

pub use extension::ExtensionRepository;
pub use locale::LocalePackRepository;
pub use schema::SchemaRepository;
