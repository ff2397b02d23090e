//! Request-time configuration pipeline
//!
//! Pipes derive or override presentation values on top of the persisted
//! config. The result is transient: it feeds dumps and caches, never the
//! store.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::{ConfigFragment, TenantConfig, Visibility};
use crate::error::{TenancyError, TenancyResult};
use crate::model::Tenant;

/// Running result of a pipeline or provider pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    /// Derived values
    pub values: BTreeMap<String, Value>,
    /// Visibility for derived keys; keys absent here are private
    pub visibility: BTreeMap<String, Visibility>,
}

impl ResolvedConfig {
    /// Start a pass from a persisted config
    pub fn from_config(config: &TenantConfig) -> Self {
        Self {
            values: config.values().clone(),
            visibility: config.visibility().clone(),
        }
    }

    /// Set a value, overwriting any earlier contribution. A `None`
    /// visibility leaves the existing tier (or private for new keys).
    pub fn set(&mut self, key: impl Into<String>, value: Value, visibility: Option<Visibility>) {
        let key = key.into();
        if let Some(vis) = visibility {
            self.visibility.insert(key.clone(), vis);
        }
        self.values.insert(key, value);
    }

    /// Overlay a fragment, overwriting on conflict
    pub fn overlay(&mut self, fragment: ConfigFragment) {
        for (key, value) in fragment.values {
            if let Some(vis) = fragment.visibility.get(&key) {
                self.visibility.insert(key.clone(), *vis);
            }
            self.values.insert(key, value);
        }
    }

    /// Visibility of a key; absent keys are private
    pub fn visibility_of(&self, key: &str) -> Visibility {
        self.visibility
            .get(key)
            .copied()
            .unwrap_or(Visibility::Private)
    }
}

/// Request-time transformer over the running config
pub trait ConfigPipe: Send + Sync {
    /// Name used in failure reports
    fn name(&self) -> &'static str;

    /// Run order; lower runs first, later pipes may overwrite
    fn priority(&self) -> u32 {
        100
    }

    /// Apply to the running result
    fn apply(&self, tenant: &Tenant, acc: &mut ResolvedConfig) -> TenancyResult<()>;
}

/// Ordered, request-time pipeline of config transformers
///
/// Later pipes intentionally may overwrite earlier ones; that is the
/// layering mechanism for environment-derived defaults on top of
/// persisted values. Output is presentation-only and never written back.
#[derive(Default)]
pub struct ConfigurationPipeline {
    pipes: Vec<Arc<dyn ConfigPipe>>,
}

impl ConfigurationPipeline {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline preloaded with the built-in pipes
    pub fn with_defaults() -> Self {
        let mut pipeline = Self::new();
        pipeline.register(Arc::new(AppUrlPipe));
        pipeline
    }

    /// Register a pipe
    pub fn register(&mut self, pipe: Arc<dyn ConfigPipe>) {
        self.pipes.push(pipe);
        self.pipes.sort_by_key(|p| p.priority());
    }

    /// Run all pipes over the tenant's persisted config
    pub fn resolve(&self, tenant: &Tenant) -> TenancyResult<ResolvedConfig> {
        let mut acc = ResolvedConfig::from_config(&tenant.config);
        for pipe in &self.pipes {
            pipe.apply(tenant, &mut acc)
                .map_err(|err| TenancyError::PipeFailed {
                    pipe: pipe.name(),
                    reason: err.to_string(),
                })?;
        }
        Ok(acc)
    }
}

/// Derives the canonical application URL from the tenant's domain
pub struct AppUrlPipe;

impl ConfigPipe for AppUrlPipe {
    fn name(&self) -> &'static str {
        "app_url"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn apply(&self, tenant: &Tenant, acc: &mut ResolvedConfig) -> TenancyResult<()> {
        acc.set(
            "app_url",
            json!(format!("https://{}", tenant.domain)),
            Some(Visibility::Public),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TenantConfig;
    use chrono::Utc;
    use uuid::Uuid;

    fn tenant_with(config: TenantConfig) -> Tenant {
        let now = Utc::now();
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

    struct StaticPipe {
        name: &'static str,
        priority: u32,
        key: &'static str,
        value: Value,
    }

    impl ConfigPipe for StaticPipe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> u32 {
            self.priority
        }

        fn apply(&self, _tenant: &Tenant, acc: &mut ResolvedConfig) -> TenancyResult<()> {
            acc.set(self.key, self.value.clone(), Some(Visibility::Protected));
            Ok(())
        }
    }

    struct FailingPipe;

    impl ConfigPipe for FailingPipe {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn apply(&self, _tenant: &Tenant, _acc: &mut ResolvedConfig) -> TenancyResult<()> {
            Err(TenancyError::InvalidConfigShape("boom".into()))
        }
    }

    #[test]
    fn test_starts_from_persisted_config() {
        let mut config = TenantConfig::new();
        config.set_with_visibility("app_name", json!("Acme"), Visibility::Public);

        let pipeline = ConfigurationPipeline::new();
        let resolved = pipeline.resolve(&tenant_with(config)).unwrap();

        assert_eq!(resolved.values.get("app_name"), Some(&json!("Acme")));
        assert_eq!(resolved.visibility_of("app_name"), Visibility::Public);
    }

    #[test]
    fn test_later_pipes_overwrite() {
        let mut pipeline = ConfigurationPipeline::new();
        pipeline.register(Arc::new(StaticPipe {
            name: "second",
            priority: 20,
            key: "k",
            value: json!("second"),
        }));
        pipeline.register(Arc::new(StaticPipe {
            name: "first",
            priority: 10,
            key: "k",
            value: json!("first"),
        }));

        let resolved = pipeline.resolve(&tenant_with(TenantConfig::new())).unwrap();
        assert_eq!(resolved.values.get("k"), Some(&json!("second")));
    }

    #[test]
    fn test_pipes_overwrite_persisted_values() {
        let mut config = TenantConfig::new();
        config.set_with_visibility("k", json!("persisted"), Visibility::Public);

        let mut pipeline = ConfigurationPipeline::new();
        pipeline.register(Arc::new(StaticPipe {
            name: "override",
            priority: 10,
            key: "k",
            value: json!("derived"),
        }));

        let tenant = tenant_with(config.clone());
        let resolved = pipeline.resolve(&tenant).unwrap();

        assert_eq!(resolved.values.get("k"), Some(&json!("derived")));
        assert_eq!(resolved.visibility_of("k"), Visibility::Protected);
        // The persisted config is untouched; pipeline output is transient.
        assert_eq!(tenant.config.get("k"), Some(&json!("persisted")));
    }

    #[test]
    fn test_failure_names_the_pipe() {
        let mut pipeline = ConfigurationPipeline::new();
        pipeline.register(Arc::new(FailingPipe));

        let err = pipeline
            .resolve(&tenant_with(TenantConfig::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            TenancyError::PipeFailed { pipe: "failing", .. }
        ));
    }

    #[test]
    fn test_app_url_pipe() {
        let pipeline = ConfigurationPipeline::with_defaults();
        let resolved = pipeline.resolve(&tenant_with(TenantConfig::new())).unwrap();

        assert_eq!(
            resolved.values.get("app_url"),
            Some(&json!("https://acme.test"))
        );
        assert_eq!(resolved.visibility_of("app_url"), Visibility::Public);
    }
}
