use crate::ContextProvider;
use std::collections::HashMap;

pub type ProviderFactory = fn() -> Box<dyn ContextProvider>;

/// Process-wide registry of context providers.
///
/// Factories are registered up front; instances are created lazily on first
/// activation and reused afterwards. At most one provider is active at a
/// time. All mutation happens on the daemon thread, so no interior locking
/// is needed.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<&'static str, ProviderFactory>,
    instances: HashMap<&'static str, Box<dyn ContextProvider>>,
    active: Option<&'static str>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, factory: ProviderFactory) {
        self.factories.insert(name, factory);
        tracing::info!(provider = name, "registered provider");
    }

    /// Activate a provider by name, instantiating it on first use.
    /// Unknown names leave the active provider unchanged.
    pub fn activate(&mut self, name: &str) -> bool {
        let Some((&key, factory)) = self.factories.get_key_value(name) else {
            tracing::warn!(provider = name, "provider not found");
            return false;
        };

        if !self.instances.contains_key(key) {
            self.instances.insert(key, factory());
        }
        self.active = Some(key);
        tracing::info!(provider = name, "activated provider");
        true
    }

    pub fn active_name(&self) -> Option<&'static str> {
        self.active
    }

    pub fn active_mut(&mut self) -> Option<&mut (dyn ContextProvider + '_)> {
        let name = self.active?;
        Some(self.instances.get_mut(name)?.as_mut())
    }

    /// Resolve (and lazily instantiate) a provider without activating it.
    pub fn provider_mut(&mut self, name: &str) -> Option<&mut (dyn ContextProvider + '_)> {
        let (&key, factory) = self.factories.get_key_value(name)?;
        if !self.instances.contains_key(key) {
            self.instances.insert(key, factory());
        }
        Some(self.instances.get_mut(key)?.as_mut())
    }

    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register_defaults;

    #[test]
    fn test_activation_resolves_instances() {
        let mut registry = ProviderRegistry::new();
        register_defaults(&mut registry);

        assert!(registry.active_name().is_none());
        assert!(registry.activate("cycling"));
        assert_eq!(registry.active_name(), Some("cycling"));
        assert_eq!(registry.active_mut().unwrap().name(), "cycling");
    }

    #[test]
    fn test_unknown_provider_is_rejected_without_state_change() {
        let mut registry = ProviderRegistry::new();
        register_defaults(&mut registry);
        registry.activate("cycling");

        assert!(!registry.activate("submarine"));
        assert_eq!(registry.active_name(), Some("cycling"));
    }

    #[test]
    fn test_instances_are_reused_across_activations() {
        let mut registry = ProviderRegistry::new();
        register_defaults(&mut registry);

        registry.activate("cycling");
        // Warm the provider's cache, switch away and back; the instance
        // (and its cache) must survive.
        let before = registry.active_mut().unwrap().context_at(37.7749, -122.4194);
        registry.activate("dating");
        registry.activate("cycling");
        let after = registry.active_mut().unwrap().context_at(37.7749, -122.4194);
        assert_eq!(before.timestamp_ms, after.timestamp_ms);
    }

    #[test]
    fn test_list_names() {
        let mut registry = ProviderRegistry::new();
        register_defaults(&mut registry);
        assert_eq!(registry.list(), vec!["cycling", "dating", "delivery"]);
    }
}
