//! Provisioning-time configuration seeders
//!
//! Seeders contribute a tenant's initial configuration when it is created
//! from a template. They run exactly once per tenant; the merged result
//! becomes the persisted config and is never re-seeded.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use crate::config::{ConfigFragment, TenantConfig, Visibility};

/// Contributor scoped to one template name
pub trait TemplateSeeder: Send + Sync {
    /// Name used in conflict logs
    fn name(&self) -> &'static str;

    /// Template this seeder contributes to
    fn template(&self) -> &str;

    /// Merge priority; lower numbers win key conflicts
    fn priority(&self) -> u32 {
        100
    }

    /// Produce the contribution, given the accumulator built so far
    fn seed(&self, template: &str, base: &TenantConfig) -> ConfigFragment;
}

/// Contributor that applies across all templates, non-destructively
pub trait SharedSeeder: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Run order among shared seeders; lower runs first
    fn priority(&self) -> u32 {
        100
    }

    /// Produce the contribution, given the accumulator built so far
    fn seed(&self, template: &str, base: &TenantConfig) -> ConfigFragment;
}

/// Statically-built, priority-sorted registry of seeders
///
/// Registration happens once at startup; iteration order is
/// deterministic: ascending priority, then registration order.
#[derive(Default)]
pub struct SeederRegistry {
    seeders: Vec<Arc<dyn TemplateSeeder>>,
    shared: Vec<Arc<dyn SharedSeeder>>,
}

impl SeederRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in seeders
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BrandingSeeder));
        registry.register(Arc::new(IsolatedStorageSeeder));
        registry.register_shared(Arc::new(PlatformDefaultsSeeder));
        registry
    }

    /// Register a per-template seeder
    pub fn register(&mut self, seeder: Arc<dyn TemplateSeeder>) {
        self.seeders.push(seeder);
    }

    /// Register a shared seeder
    pub fn register_shared(&mut self, seeder: Arc<dyn SharedSeeder>) {
        self.shared.push(seeder);
    }

    /// Build the initial config for a template.
    ///
    /// Per-template seeders run in ascending priority; on key conflicts
    /// between different priorities the lower priority number wins. A
    /// conflict between equal-priority seeders is logged and resolved by
    /// registration order (first registration keeps the key). Shared
    /// seeders then fill whatever keys are still absent.
    pub fn seed(&self, template: &str) -> TenantConfig {
        let mut acc = TenantConfig::new();
        // key -> (priority, seeder name) of the writer that won it
        let mut owners: BTreeMap<String, (u32, &'static str)> = BTreeMap::new();

        let mut ordered: Vec<&Arc<dyn TemplateSeeder>> = self
            .seeders
            .iter()
            .filter(|s| s.template() == template)
            .collect();
        ordered.sort_by_key(|s| s.priority());

        for seeder in ordered {
            let fragment = seeder.seed(template, &acc);
            for (key, value) in fragment.values {
                match owners.get(&key) {
                    None => {
                        match fragment.visibility.get(&key) {
                            Some(vis) => acc.set_with_visibility(key.clone(), value, *vis),
                            None => acc.set(key.clone(), value),
                        }
                        owners.insert(key, (seeder.priority(), seeder.name()));
                    }
                    Some((priority, winner)) if *priority == seeder.priority() => {
                        tracing::warn!(
                            template,
                            key = %key,
                            kept = winner,
                            dropped = seeder.name(),
                            "equal-priority seeder conflict, keeping first registration"
                        );
                    }
                    // A lower priority number already won this key.
                    Some(_) => {}
                }
            }
        }

        let mut shared: Vec<&Arc<dyn SharedSeeder>> = self.shared.iter().collect();
        shared.sort_by_key(|s| s.priority());
        for seeder in shared {
            let fragment = seeder.seed(template, &acc);
            acc.merge_absent(fragment);
        }

        acc
    }
}

/// Branding defaults for the "basic" template
pub struct BrandingSeeder;

impl TemplateSeeder for BrandingSeeder {
    fn name(&self) -> &'static str {
        "branding"
    }

    fn template(&self) -> &str {
        "basic"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn seed(&self, _template: &str, _base: &TenantConfig) -> ConfigFragment {
        ConfigFragment::new()
            .with("theme", json!("default"), Some(Visibility::Public))
            .with("logo_url", json!(Option::<String>::None), Some(Visibility::Public))
            .with("primary_color", json!("#0066cc"), Some(Visibility::Public))
    }
}

/// Storage settings for the "isolated" template
pub struct IsolatedStorageSeeder;

impl TemplateSeeder for IsolatedStorageSeeder {
    fn name(&self) -> &'static str {
        "isolated_storage"
    }

    fn template(&self) -> &str {
        "isolated"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn seed(&self, _template: &str, _base: &TenantConfig) -> ConfigFragment {
        ConfigFragment::new()
            .with("storage_mode", json!("isolated"), Some(Visibility::Protected))
            .with("database_prefix", json!("tenant_"), None)
    }
}

/// Platform-wide defaults filled for every template
pub struct PlatformDefaultsSeeder;

impl SharedSeeder for PlatformDefaultsSeeder {
    fn name(&self) -> &'static str {
        "platform_defaults"
    }

    fn seed(&self, _template: &str, _base: &TenantConfig) -> ConfigFragment {
        ConfigFragment::new()
            .with("locale", json!("en"), Some(Visibility::Protected))
            .with("timezone", json!("UTC"), Some(Visibility::Protected))
            .with("allow_public_config_api", json!(false), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct StaticSeeder {
        name: &'static str,
        template: &'static str,
        priority: u32,
        fragment: ConfigFragment,
    }

    impl TemplateSeeder for StaticSeeder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn template(&self) -> &str {
            self.template
        }

        fn priority(&self) -> u32 {
            self.priority
        }

        fn seed(&self, _template: &str, _base: &TenantConfig) -> ConfigFragment {
            self.fragment.clone()
        }
    }

    struct StaticShared(ConfigFragment);

    impl SharedSeeder for StaticShared {
        fn name(&self) -> &'static str {
            "static_shared"
        }

        fn seed(&self, _template: &str, _base: &TenantConfig) -> ConfigFragment {
            self.0.clone()
        }
    }

    fn seeder(name: &'static str, priority: u32, key: &str, value: Value) -> Arc<StaticSeeder> {
        Arc::new(StaticSeeder {
            name,
            template: "basic",
            priority,
            fragment: ConfigFragment::new().with(key, value, Some(Visibility::Protected)),
        })
    }

    #[test]
    fn test_lower_priority_number_wins() {
        let mut registry = SeederRegistry::new();
        registry.register(seeder("a", 10, "k", json!(1)));
        registry.register(seeder("b", 20, "k", json!(2)));

        let config = registry.seed("basic");
        assert_eq!(config.get("k"), Some(&json!(1)));
    }

    #[test]
    fn test_registration_order_breaks_priority_ties() {
        // Registered out of priority order on purpose; the tie at 10 is
        // still broken by registration order of the tied seeders.
        let mut registry = SeederRegistry::new();
        registry.register(seeder("late", 20, "k", json!("late")));
        registry.register(seeder("first", 10, "k", json!("first")));
        registry.register(seeder("second", 10, "k", json!("second")));

        let config = registry.seed("basic");
        assert_eq!(config.get("k"), Some(&json!("first")));
    }

    #[test]
    fn test_template_scoping() {
        let mut registry = SeederRegistry::new();
        registry.register(seeder("basic_only", 10, "k", json!("basic")));

        let config = registry.seed("isolated");
        assert!(!config.has("k"));
    }

    #[test]
    fn test_shared_seeder_never_overwrites() {
        let mut registry = SeederRegistry::new();
        registry.register(seeder("template", 10, "k", json!(1)));
        registry.register_shared(Arc::new(StaticShared(
            ConfigFragment::new()
                .with("k", json!(99), Some(Visibility::Public))
                .with("extra", json!("filled"), Some(Visibility::Public)),
        )));

        let config = registry.seed("basic");
        assert_eq!(config.get("k"), Some(&json!(1)));
        assert_eq!(config.visibility_of("k"), Visibility::Protected);
        assert_eq!(config.get("extra"), Some(&json!("filled")));
    }

    #[test]
    fn test_built_in_templates() {
        let registry = SeederRegistry::with_defaults();

        let basic = registry.seed("basic");
        assert!(basic.has("theme"));
        assert_eq!(basic.get("allow_public_config_api"), Some(&json!(false)));
        assert_eq!(
            basic.visibility_of("allow_public_config_api"),
            Visibility::Private
        );

        let isolated = registry.seed("isolated");
        assert!(isolated.has("storage_mode"));
        assert!(!isolated.has("theme"));
        assert!(isolated.has("locale"));
    }

    #[test]
    fn test_seeder_sees_accumulator() {
        struct DerivedSeeder;

        impl TemplateSeeder for DerivedSeeder {
            fn name(&self) -> &'static str {
                "derived"
            }

            fn template(&self) -> &str {
                "basic"
            }

            fn priority(&self) -> u32 {
                20
            }

            fn seed(&self, _template: &str, base: &TenantConfig) -> ConfigFragment {
                let theme = base.get("theme").cloned().unwrap_or(json!("unknown"));
                ConfigFragment::new().with("derived_from_theme", theme, None)
            }
        }

        let mut registry = SeederRegistry::new();
        registry.register(Arc::new(BrandingSeeder));
        registry.register(Arc::new(DerivedSeeder));

        let config = registry.seed("basic");
        assert_eq!(config.get("derived_from_theme"), Some(&json!("default")));
    }
}
