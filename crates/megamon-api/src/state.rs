//! Application state shared across all handlers.

use std::sync::Arc;

use megamon_core::config::AppConfig;
use megamon_core::events::EventBus;
use megamon_extension::components::ComponentLoader;
use megamon_extension::lifecycle::LifecycleController;
use megamon_extension::mounter::RouteMounter;
use megamon_extension::registry::{ExtensionRegistry, LocalePackStore};
use megamon_extension::relationships::RelationshipResolver;

/// Application state passed to every Axum handler via `State<AppState>`.
///
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Extension catalog.
    pub registry: Arc<dyn ExtensionRegistry>,
    /// Locale pack storage.
    pub locale_store: Arc<dyn LocalePackStore>,
    /// Live extension route table.
    pub mounter: Arc<RouteMounter>,
    /// Install / enable / disable / uninstall orchestration.
    pub lifecycle: Arc<LifecycleController>,
    /// Frontend component loader.
    pub components: Arc<ComponentLoader>,
    /// Cross-extension capability resolver.
    pub resolver: Arc<RelationshipResolver>,
    /// Lifecycle event bus.
    pub events: EventBus,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish()
    }
}
