//! Provider registry for managing available providers.

use std::collections::HashMap;
use std::sync::Arc;

use taskpilot_core::Config;

use super::google::GoogleProvider;
use super::mock::MockProvider;
use super::traits::{ModelInfo, Provider};

/// Registry of available model providers.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: Option<String>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: None,
        }
    }

    /// Initialize the registry from configuration.
    ///
    /// Tries the API key from the config first, then falls back to the
    /// GOOGLE_API_KEY environment variable. In demo mode, or when no key
    /// is available, a mock provider is registered instead so the CLI
    /// keeps working against canned data.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        if !config.general.demo {
            if let Some(api_key) = config.google_api_key() {
                let mut provider = GoogleProvider::new(&api_key);
                if !config.general.model.is_empty() {
                    provider = provider.with_default_model(&config.general.model);
                }
                registry.register(Arc::new(provider));
            }
        }

        if registry.providers.is_empty() {
            registry.register(Arc::new(MockProvider::new()));
        }

        if registry.providers.contains_key(config.general.provider.as_str()) {
            registry.set_default(&config.general.provider);
        }

        registry
    }

    /// Initialize the registry from environment variables only.
    pub fn from_env() -> Self {
        let mut registry = Self::new();

        if let Some(provider) = GoogleProvider::from_env() {
            registry.register(Arc::new(provider));
        } else {
            registry.register(Arc::new(MockProvider::new()));
        }

        registry
    }

    /// Register a provider.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let id = provider.id().to_string();
        if self.default_provider.is_none() {
            self.default_provider = Some(id.clone());
        }
        self.providers.insert(id, provider);
    }

    /// Get a provider by ID.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(id).cloned()
    }

    /// Get the default provider.
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.default_provider.as_ref().and_then(|id| self.get(id))
    }

    /// Set the default provider.
    pub fn set_default(&mut self, id: &str) -> bool {
        if self.providers.contains_key(id) {
            self.default_provider = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// List all registered providers.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    /// Get all available models across all providers.
    pub fn all_models(&self) -> Vec<ModelInfo> {
        self.providers
            .values()
            .flat_map(|p| p.available_models())
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_config_registers_mock() {
        let mut config = Config::default();
        config.general.demo = true;
        let registry = ProviderRegistry::from_config(&config);
        assert!(registry.get("mock").is_some());
        let default = registry.default_provider().map(|p| p.id().to_string());
        assert_eq!(default.as_deref(), Some("mock"));
    }

    #[test]
    fn test_first_registered_becomes_default() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider::new()));
        assert!(registry.default_provider().is_some());
    }

    #[test]
    fn test_set_default_unknown_provider_fails() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider::new()));
        assert!(!registry.set_default("google"));
    }
}
