//! Dump-time configuration providers
//!
//! Providers inject derived, non-persisted fields into every
//! outward-facing tenant representation, so modules can contribute
//! uniformly without touching the store.

use std::sync::Arc;

use serde_json::json;

use crate::config::{ConfigFragment, Visibility};
use crate::model::Tenant;
use crate::pipeline::ResolvedConfig;

/// Dump-time contributor of derived config entries
pub trait ConfigProvider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Run order; lower runs first, higher priority wins conflicts
    fn priority(&self) -> u32 {
        100
    }

    /// Contribution merged on top of the running result
    fn contribute(&self, tenant: &Tenant) -> ConfigFragment;
}

/// Statically-built, priority-sorted registry of providers
#[derive(Default)]
pub struct ConfigProviderRegistry {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl ConfigProviderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in providers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FeatureFlagsProvider));
        registry
    }

    /// Register a provider
    pub fn register(&mut self, provider: Arc<dyn ConfigProvider>) {
        self.providers.push(provider);
        self.providers.sort_by_key(|p| p.priority());
    }

    /// Merge every provider's contribution on top of the running result.
    /// Providers run in ascending priority; on key conflicts the higher
    /// priority (later) contribution wins.
    pub fn enhance(&self, tenant: &Tenant, mut acc: ResolvedConfig) -> ResolvedConfig {
        for provider in &self.providers {
            acc.overlay(provider.contribute(tenant));
        }
        acc
    }
}

/// Derives feature flags from the tenant's subscription tier label
pub struct FeatureFlagsProvider;

impl ConfigProvider for FeatureFlagsProvider {
    fn name(&self) -> &'static str {
        "feature_flags"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn contribute(&self, tenant: &Tenant) -> ConfigFragment {
        let features: Vec<&str> = match tenant.config.tier() {
            Some("enterprise") => vec!["sso", "audit_log", "custom_domain", "api_access"],
            Some("business") => vec!["audit_log", "api_access"],
            _ => vec![],
        };

        ConfigFragment::new().with("feature_flags", json!(features), Some(Visibility::Protected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TenantConfig;
    use chrono::Utc;
    use serde_json::Value;
    use uuid::Uuid;

    fn tenant(tier: Option<&str>) -> Tenant {
        let now = Utc::now();
        let mut config = TenantConfig::new();
        config.set_tier(tier.map(str::to_string));
        Tenant {
            id: 1,
            public_id: Uuid::new_v4(),
            name: "Acme".into(),
            domain: "acme.test".into(),
            parent_id: None,
            is_active: true,
            config,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    struct StaticProvider {
        name: &'static str,
        priority: u32,
        value: Value,
    }

    impl ConfigProvider for StaticProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> u32 {
            self.priority
        }

        fn contribute(&self, _tenant: &Tenant) -> ConfigFragment {
            ConfigFragment::new().with("k", self.value.clone(), Some(Visibility::Public))
        }
    }

    #[test]
    fn test_higher_priority_wins_conflicts() {
        let mut registry = ConfigProviderRegistry::new();
        registry.register(Arc::new(StaticProvider {
            name: "high",
            priority: 20,
            value: json!("high"),
        }));
        registry.register(Arc::new(StaticProvider {
            name: "low",
            priority: 10,
            value: json!("low"),
        }));

        let resolved = registry.enhance(&tenant(None), ResolvedConfig::default());
        assert_eq!(resolved.values.get("k"), Some(&json!("high")));
    }

    #[test]
    fn test_feature_flags_follow_tier() {
        let registry = ConfigProviderRegistry::with_defaults();

        let resolved = registry.enhance(&tenant(Some("enterprise")), ResolvedConfig::default());
        let flags = resolved.values.get("feature_flags").unwrap();
        assert!(flags.as_array().unwrap().contains(&json!("sso")));
        assert_eq!(resolved.visibility_of("feature_flags"), Visibility::Protected);

        let resolved = registry.enhance(&tenant(None), ResolvedConfig::default());
        assert_eq!(resolved.values.get("feature_flags"), Some(&json!([])));
    }
}
