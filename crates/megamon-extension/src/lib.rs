//! # megamon-extension
//!
//! The extension lifecycle subsystem for Mega Monitor. Provides:
//!
//! - Manifest reading and validation
//! - Backend route mounting with a live, lock-guarded route table
//! - Locale pack loading with deterministic three-tier fallback
//! - Lazy, cached frontend component loading
//! - Install / enable / disable / uninstall orchestration
//! - Cross-extension capability discovery

pub mod archive;
pub mod components;
pub mod entry;
pub mod lifecycle;
pub mod locales;
pub mod manifest;
pub mod mounter;
pub mod provider;
pub mod registry;
pub mod relationships;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use components::{ComponentHandle, ComponentLoader, EntryField};
pub use entry::EntryLoader;
pub use lifecycle::{LifecycleController, UninstallOptions, UninstallReport};
pub use mounter::RouteMounter;
pub use provider::{ExtensionHandler, ExtensionRequest, ExtensionResponse, RouteBinding, RouteProvider};
pub use registry::{ExtensionRegistry, LocalePackStore, SchemaStore};
pub use relationships::RelationshipResolver;
