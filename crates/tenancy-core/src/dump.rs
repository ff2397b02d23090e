//! Visibility-filtered tenant serialization
//!
//! The dump service assembles every outward-facing tenant
//! representation: run the request-time pipeline, merge provider
//! contributions, then filter by visibility tier. Internal ids never
//! appear in a dump.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{Visibility, VISIBILITY_KEY};
use crate::error::{TenancyError, TenancyResult};
use crate::model::Tenant;
use crate::pipeline::{ConfigurationPipeline, ResolvedConfig};
use crate::provider::ConfigProviderRegistry;
use crate::resolver::TenantDirectory;

/// Config flag a tenant must set to opt into the public config API
pub const PUBLIC_API_FLAG: &str = "allow_public_config_api";

/// TTL of the all-tenants dump cache
pub const DUMP_CACHE_TTL: Duration = Duration::from_secs(60);

/// Which visibility tiers a dump may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpMode {
    /// Public + protected tiers; internal callers only
    Protected,
    /// Public tier only; requires the tenant's opt-in flag
    Public,
}

impl DumpMode {
    fn max_visibility(self) -> Visibility {
        match self {
            Self::Protected => Visibility::Protected,
            Self::Public => Visibility::Public,
        }
    }
}

/// Outward-facing tenant representation
///
/// `config` holds the visible keys plus a mandatory `__visibility`
/// companion map of exactly those keys, so callers can tell an empty
/// value from a hidden one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TenantDump {
    /// External-safe tenant id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Resolution identifier
    pub domain: String,
    /// External-safe id of the parent tenant
    pub parent_id: Option<Uuid>,
    /// Visibility-filtered config with its `__visibility` companion
    #[schema(value_type = Object)]
    pub config: Map<String, Value>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Assembles and caches outward-facing tenant representations
pub struct TenantDumpService {
    directory: Arc<dyn TenantDirectory>,
    pipeline: ConfigurationPipeline,
    providers: ConfigProviderRegistry,
    all_cache: Cache<(), Arc<Vec<TenantDump>>>,
}

impl TenantDumpService {
    /// Service with the default 60s list-cache TTL
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        pipeline: ConfigurationPipeline,
        providers: ConfigProviderRegistry,
    ) -> Self {
        Self::with_ttl(directory, pipeline, providers, DUMP_CACHE_TTL)
    }

    /// Service with an explicit list-cache TTL
    pub fn with_ttl(
        directory: Arc<dyn TenantDirectory>,
        pipeline: ConfigurationPipeline,
        providers: ConfigProviderRegistry,
        ttl: Duration,
    ) -> Self {
        let all_cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();

        Self {
            directory,
            pipeline,
            providers,
            all_cache,
        }
    }

    /// Serialize one tenant under the given mode.
    ///
    /// `Public` mode is a hard gate: unless the tenant's own persisted
    /// config sets `allow_public_config_api = true`, the result is
    /// `TenantNotFound` regardless of any key's visibility — a disabled
    /// tenant is indistinguishable from a missing one.
    pub fn dump(&self, tenant: &Tenant, mode: DumpMode) -> TenancyResult<TenantDump> {
        if mode == DumpMode::Public
            && tenant.config.get(PUBLIC_API_FLAG).and_then(Value::as_bool) != Some(true)
        {
            return Err(TenancyError::TenantNotFound);
        }

        // Pipeline failure degrades to the persisted config; a dump must
        // not take the whole request down with it.
        let resolved = match self.pipeline.resolve(tenant) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::error!(
                    tenant = %tenant.public_id,
                    error = %err,
                    "config pipeline failed, serving persisted config"
                );
                ResolvedConfig::from_config(&tenant.config)
            }
        };
        let resolved = self.providers.enhance(tenant, resolved);

        let parent_id = tenant
            .parent_id
            .and_then(|_| self.directory.find_parent(tenant))
            .map(|parent| parent.public_id);

        Ok(TenantDump {
            id: tenant.public_id,
            name: tenant.name.clone(),
            domain: tenant.domain.clone(),
            parent_id,
            config: filtered_config(&resolved, mode.max_visibility()),
            created_at: tenant.created_at,
            updated_at: tenant.updated_at,
        })
    }

    /// The `Protected`-mode dump of every non-deleted tenant, cached
    /// behind one key for [`DUMP_CACHE_TTL`].
    ///
    /// Concurrent misses may each recompute; the last write wins. That
    /// staleness window is accepted by design of the cache contract.
    pub fn dump_all(&self) -> Arc<Vec<TenantDump>> {
        if let Some(cached) = self.all_cache.get(&()) {
            return cached;
        }

        let dumps: Vec<TenantDump> = self
            .directory
            .all()
            .iter()
            .filter_map(|tenant| self.dump(tenant, DumpMode::Protected).ok())
            .collect();

        let dumps = Arc::new(dumps);
        self.all_cache.insert((), dumps.clone());
        dumps
    }

    /// Drop the cached all-tenants list, e.g. after provisioning
    pub fn invalidate(&self) {
        self.all_cache.invalidate(&());
    }
}

// Visible keys under `max`, plus the `__visibility` companion of exactly
// those keys. The companion is always present, even when empty.
fn filtered_config(resolved: &ResolvedConfig, max: Visibility) -> Map<String, Value> {
    let mut config = Map::new();
    let mut visibility = Map::new();

    for (key, value) in &resolved.values {
        let tier = resolved.visibility_of(key);
        if tier <= max {
            config.insert(key.clone(), value.clone());
            visibility.insert(key.clone(), Value::String(tier.as_str().into()));
        }
    }

    config.insert(VISIBILITY_KEY.into(), Value::Object(visibility));
    config
}
