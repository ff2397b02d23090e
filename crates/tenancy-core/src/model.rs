//! Tenant data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TenantConfig;

/// Internal tenant id, assigned by the registry and never serialized
/// outward
pub type TenantId = u64;

/// Tenant definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Internal id
    pub id: TenantId,
    /// External-safe identifier
    pub public_id: Uuid,
    /// Display name
    pub name: String,
    /// Resolution identifier (domain or subdomain label)
    pub domain: String,
    /// Parent tenant for hierarchies
    pub parent_id: Option<TenantId>,
    /// Inactive tenants never resolve
    pub is_active: bool,
    /// Persisted configuration
    pub config: TenantConfig,
    /// Soft-delete timestamp
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// True when the tenant is soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// True when the tenant may be returned by resolution
    pub fn is_resolvable(&self) -> bool {
        self.is_active && !self.is_deleted()
    }
}

/// Fields for provisioning a tenant
#[derive(Debug, Clone)]
pub struct NewTenant {
    /// Display name
    pub name: String,
    /// Resolution identifier; unique among non-deleted tenants
    pub domain: String,
    /// Seeder template, e.g. "basic" or "isolated"
    pub template: String,
    /// Parent tenant
    pub parent_id: Option<TenantId>,
    /// Subscription tier label
    pub tier: Option<String>,
}

impl NewTenant {
    /// Provisioning request with the "basic" template and no parent
    pub fn basic(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            template: "basic".into(),
            parent_id: None,
            tier: None,
        }
    }
}

/// Partial update applied by admin operations
#[derive(Debug, Clone, Default)]
pub struct TenantUpdate {
    /// New display name
    pub name: Option<String>,
    /// New resolution identifier
    pub domain: Option<String>,
    /// Activate or deactivate
    pub is_active: Option<bool>,
    /// New subscription tier label
    pub tier: Option<String>,
}
