//! Domain events emitted by extension lifecycle operations.
//!
//! Events are published on the broadcast [`bus::EventBus`] and consumed
//! by UI refresh listeners and audit logging instead of any
//! process-global refresh hook.

pub mod bus;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use bus::EventBus;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: ExtensionEvent,
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(payload: ExtensionEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Extension lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExtensionEvent {
    /// An extension was installed.
    Installed {
        /// Registry ID of the new extension.
        extension_id: i32,
        /// Extension name.
        name: String,
        /// Extension version.
        version: String,
    },
    /// An extension was enabled and its routes mounted.
    Enabled {
        /// Registry ID.
        extension_id: i32,
        /// Extension name.
        name: String,
    },
    /// An extension was disabled and its routes unmounted.
    Disabled {
        /// Registry ID.
        extension_id: i32,
        /// Extension name.
        name: String,
    },
    /// An extension's backend routes failed to mount.
    MountFailed {
        /// Registry ID.
        extension_id: i32,
        /// Extension name.
        name: String,
        /// The mount error message.
        error: String,
    },
    /// An extension was uninstalled.
    Uninstalled {
        /// Registry ID of the removed extension.
        extension_id: i32,
        /// Extension name.
        name: String,
        /// Whether every cleanup step succeeded.
        clean: bool,
    },
}
