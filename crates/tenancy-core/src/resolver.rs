//! Tenant resolution with a short-TTL lookup cache

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use serde::{Deserialize, Serialize};

use crate::error::{TenancyError, TenancyResult};
use crate::model::Tenant;

/// Default TTL of the resolution cache
pub const DEFAULT_RESOLVER_TTL: Duration = Duration::from_secs(300);

const RESOLVER_CACHE_CAPACITY: u64 = 10_000;

/// Storage-facing lookup interface consulted on cache misses
pub trait TenantDirectory: Send + Sync {
    /// Find an active, non-deleted tenant by its resolution identifier
    fn find_by_identifier(&self, key: &str) -> Option<Tenant>;

    /// All non-deleted tenants
    fn all(&self) -> Vec<Tenant>;

    /// Parent of a tenant, if any
    fn find_parent(&self, tenant: &Tenant) -> Option<Tenant>;
}

/// How an inbound request maps to a resolution key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Exact host match
    Domain,
    /// Leftmost label under a base domain
    Subdomain {
        /// Suffix the subdomain label sits under, e.g. "app.test"
        base_domain: String,
    },
    /// Named request header carries the key
    Header {
        /// Header name, matched case-insensitively
        name: String,
    },
    /// Path segment at an index carries the key
    PathSegment {
        /// Zero-based segment index
        index: usize,
    },
}

impl Default for ResolutionStrategy {
    fn default() -> Self {
        Self::Domain
    }
}

/// Request attributes a strategy may draw the key from
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Host header, possibly with a port
    pub host: Option<String>,
    /// Request path
    pub path: String,
    /// Request headers as lossy strings
    pub headers: Vec<(String, String)>,
}

impl ResolutionStrategy {
    /// Extract the resolution key from request attributes
    pub fn extract(&self, meta: &RequestMeta) -> Option<String> {
        match self {
            Self::Domain => meta.host.as_deref().map(normalize_host),
            Self::Subdomain { base_domain } => {
                let host = meta.host.as_deref().map(normalize_host)?;
                let suffix = format!(".{}", base_domain.to_ascii_lowercase());
                let label = host.strip_suffix(&suffix)?;
                // Only the leftmost label, not nested subdomains.
                if label.is_empty() || label.contains('.') {
                    return None;
                }
                Some(label.to_string())
            }
            Self::Header { name } => meta
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            Self::PathSegment { index } => meta
                .path
                .split('/')
                .filter(|s| !s.is_empty())
                .nth(*index)
                .map(str::to_string),
        }
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.rsplit_once(':').map_or(host, |(h, _)| h);
    host.to_ascii_lowercase()
}

/// Maps a resolution key to a tenant, consulting a TTL cache before the
/// directory
///
/// Resolution is deterministic within the TTL window; staleness beyond it
/// is accepted. A missing match is a typed failure, never a fallback to
/// some default tenant.
pub struct TenantResolver {
    directory: Arc<dyn TenantDirectory>,
    strategy: ResolutionStrategy,
    cache: Cache<String, Tenant>,
}

impl TenantResolver {
    /// Resolver with the default 300s cache TTL
    pub fn new(directory: Arc<dyn TenantDirectory>, strategy: ResolutionStrategy) -> Self {
        Self::with_ttl(directory, strategy, DEFAULT_RESOLVER_TTL)
    }

    /// Resolver with an explicit cache TTL
    pub fn with_ttl(
        directory: Arc<dyn TenantDirectory>,
        strategy: ResolutionStrategy,
        ttl: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(RESOLVER_CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self {
            directory,
            strategy,
            cache,
        }
    }

    /// The configured resolution strategy
    pub fn strategy(&self) -> &ResolutionStrategy {
        &self.strategy
    }

    /// Resolve a lookup key to a tenant
    pub fn resolve(&self, key: &str) -> TenancyResult<Tenant> {
        if let Some(tenant) = self.cache.get(key) {
            return Ok(tenant);
        }

        let tenant = self
            .directory
            .find_by_identifier(key)
            .ok_or(TenancyError::TenantNotFound)?;

        self.cache.insert(key.to_string(), tenant.clone());
        Ok(tenant)
    }

    /// Extract the key from request attributes and resolve it
    pub fn resolve_request(&self, meta: &RequestMeta) -> TenancyResult<Tenant> {
        let key = self
            .strategy
            .extract(meta)
            .ok_or(TenancyError::TenantNotFound)?;
        self.resolve(&key)
    }

    /// Drop a key from the cache, e.g. after an admin update
    pub fn invalidate(&self, key: &str) {
        self.cache.invalidate(key);
    }

    /// Drop every cached entry
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}
