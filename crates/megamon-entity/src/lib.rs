//! # megamon-entity
//!
//! Entity models shared across the Mega Monitor crates: the persistent
//! extension registry record and the transient manifest descriptor.

pub mod extension;

pub use extension::manifest::{ManifestDescriptor, OwnedSchema};
pub use extension::model::{CreateExtension, ExtensionRecord};
