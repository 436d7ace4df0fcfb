//! Cross-extension capability discovery.
//!
//! One extension declares in its manifest that it `provides` a capability
//! (e.g. `content_embedders`); consumers discover the providers through
//! the registry and load both the provider's component and its locale
//! pack, so an embedded component never renders raw keys just because it
//! was loaded out-of-band from its own activation path.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use megamon_core::AppResult;

use crate::components::{ComponentHandle, ComponentLoader, EntryField};
use crate::locales;
use crate::registry::{ExtensionRegistry, LocalePackStore};

/// One discovered capability provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityProvider {
    /// Providing extension's registry ID.
    pub extension_id: i32,
    /// Providing extension's name.
    pub name: String,
    /// Providing extension's version.
    pub version: String,
    /// The declared descriptor for this capability entry.
    pub descriptor: serde_json::Value,
    /// Declared ordering priority, if any (lower first).
    pub priority: Option<i64>,
}

/// A provider's component together with its locale pack, ready to embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedComponent {
    /// The loaded (or placeholder) component handle.
    pub component: ComponentHandle,
    /// The provider's strings for the requested language.
    pub locale: HashMap<String, String>,
}

/// Resolves `provides` declarations across enabled extensions.
pub struct RelationshipResolver {
    registry: Arc<dyn ExtensionRegistry>,
    components: Arc<ComponentLoader>,
    locale_store: Arc<dyn LocalePackStore>,
}

impl RelationshipResolver {
    /// Creates a resolver.
    pub fn new(
        registry: Arc<dyn ExtensionRegistry>,
        components: Arc<ComponentLoader>,
        locale_store: Arc<dyn LocalePackStore>,
    ) -> Self {
        Self {
            registry,
            components,
            locale_store,
        }
    }

    /// All enabled providers of `capability`, ordered by declared
    /// priority ascending where present, then by extension ID ascending
    /// (registry insertion order).
    pub async fn providers_of(&self, capability: &str) -> AppResult<Vec<CapabilityProvider>> {
        let mut providers = Vec::new();

        // list_enabled is ID-ascending, which keeps the no-priority
        // ordering stable.
        for record in self.registry.list_enabled().await? {
            for descriptor in record.provided(capability) {
                let priority = descriptor.get("priority").and_then(|p| p.as_i64());
                providers.push(CapabilityProvider {
                    extension_id: record.id,
                    name: record.name.clone(),
                    version: record.version.clone(),
                    descriptor: descriptor.clone(),
                    priority,
                });
            }
        }

        providers.sort_by_key(|p| (p.priority.unwrap_or(i64::MAX), p.extension_id));
        Ok(providers)
    }

    /// Loads a provider's component and locale pack for embedding.
    ///
    /// The descriptor's `component` field overrides the provider's
    /// declared widget entry. Load failures degrade to a placeholder.
    pub async fn load_embedder(
        &self,
        provider: &CapabilityProvider,
        language: &str,
    ) -> AppResult<EmbeddedComponent> {
        let record = self
            .registry
            .find(provider.extension_id)
            .await?
            .ok_or_else(|| {
                megamon_core::AppError::not_found(format!(
                    "Provider extension {} no longer installed",
                    provider.extension_id
                ))
            })?;

        let component = match descriptor_component(&provider.descriptor) {
            Some(path) => match self.components.load_path(&record, path).await {
                Ok(handle) => handle,
                Err(_) => ComponentHandle::unavailable(self.components.specifier(&record, path)),
            },
            None => {
                self.components
                    .load_or_placeholder(&record, EntryField::Widget)
                    .await
            }
        };

        let locale =
            locales::pack_from_store(self.locale_store.as_ref(), record.id, language).await?;

        Ok(EmbeddedComponent { component, locale })
    }
}

impl std::fmt::Debug for RelationshipResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipResolver").finish()
    }
}

fn descriptor_component(descriptor: &serde_json::Value) -> Option<&str> {
    descriptor.get("component").and_then(|c| c.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{MemoryLocaleStore, MemoryRegistry};

    async fn seed(registry: &MemoryRegistry, name: &str, provides: serde_json::Value) -> i32 {
        let mut record = MemoryRegistry::record(name, "1.0.0");
        record.frontend_entry = Some("Widget.vue".to_string());
        record.provides = provides;
        registry.seed(record).await
    }

    fn resolver(
        registry: Arc<MemoryRegistry>,
        locales: Arc<MemoryLocaleStore>,
    ) -> RelationshipResolver {
        let components = Arc::new(ComponentLoader::new("/tmp/megamon-frontend"));
        RelationshipResolver::new(registry, components, locales)
    }

    #[tokio::test]
    async fn providers_default_to_id_order() {
        let registry = Arc::new(MemoryRegistry::default());
        seed(
            &registry,
            "Blog",
            serde_json::json!({"content_embedders": [{"component": "Embed.vue"}]}),
        )
        .await;
        seed(
            &registry,
            "Store",
            serde_json::json!({"content_embedders": [{"component": "Card.vue"}]}),
        )
        .await;
        // Declares a different capability; must not appear.
        seed(&registry, "Calendar", serde_json::json!({"calendars": [{}]})).await;

        let resolver = resolver(registry, Arc::new(MemoryLocaleStore::default()));
        let providers = resolver.providers_of("content_embedders").await.unwrap();

        let names: Vec<&str> = providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Blog", "Store"]);
    }

    #[tokio::test]
    async fn declared_priority_overrides_id_order() {
        let registry = Arc::new(MemoryRegistry::default());
        seed(
            &registry,
            "Blog",
            serde_json::json!({"content_embedders": [{"component": "Embed.vue"}]}),
        )
        .await;
        seed(
            &registry,
            "Store",
            serde_json::json!({"content_embedders": [{"component": "Card.vue", "priority": 1}]}),
        )
        .await;

        let resolver = resolver(registry, Arc::new(MemoryLocaleStore::default()));
        let providers = resolver.providers_of("content_embedders").await.unwrap();

        let names: Vec<&str> = providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Store", "Blog"]);
    }

    #[tokio::test]
    async fn disabled_providers_are_excluded() {
        let registry = Arc::new(MemoryRegistry::default());
        let id = seed(&registry, "Blog", serde_json::json!({"content_embedders": [{}]})).await;
        registry.set_enabled(id, false).await.unwrap();

        let resolver = resolver(registry, Arc::new(MemoryLocaleStore::default()));
        assert!(resolver
            .providers_of("content_embedders")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn embedder_carries_locale_pack_with_fallback() {
        let registry = Arc::new(MemoryRegistry::default());
        let id = seed(
            &registry,
            "Blog",
            serde_json::json!({"content_embedders": [{"component": "Embed.vue"}]}),
        )
        .await;

        let locales = Arc::new(MemoryLocaleStore::default());
        let mut en = HashMap::new();
        en.insert("blog.embed.title".to_string(), "Embedded post".to_string());
        locales.upsert(id, "en", &en).await.unwrap();

        let resolver = resolver(registry, locales);
        let providers = resolver.providers_of("content_embedders").await.unwrap();
        // `fr` is not stored; the pack falls back to en.
        let embedded = resolver.load_embedder(&providers[0], "fr").await.unwrap();

        assert_eq!(embedded.locale["blog.embed.title"], "Embedded post");
        // The component file does not exist on disk, so the handle is a
        // placeholder rather than an error.
        assert!(embedded.component.placeholder);
    }
}
