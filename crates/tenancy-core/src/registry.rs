//! In-memory tenant registry and provisioning
//!
//! Stands in for the persistence layer behind the `TenantDirectory`
//! trait. Tenants are born here from a template (the seeder pipeline runs
//! exactly once, at creation) and are soft-deleted; a hard delete is a
//! rare administrative purge.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::config::Visibility;
use crate::error::{TenancyError, TenancyResult};
use crate::model::{NewTenant, Tenant, TenantId, TenantUpdate};
use crate::resolver::TenantDirectory;
use crate::seed::SeederRegistry;

/// Tenant registry
pub struct TenantRegistry {
    tenants: Arc<RwLock<HashMap<TenantId, Tenant>>>,
    next_id: AtomicU64,
    seeders: SeederRegistry,
}

impl TenantRegistry {
    /// Registry with the built-in seeders
    pub fn new() -> Self {
        Self::with_seeders(SeederRegistry::with_defaults())
    }

    /// Registry with an explicit seeder set
    pub fn with_seeders(seeders: SeederRegistry) -> Self {
        Self {
            tenants: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            seeders,
        }
    }

    /// Provision a tenant from a template
    pub fn create(&self, new: NewTenant) -> TenancyResult<Tenant> {
        let mut tenants = self.tenants.write();

        let domain = new.domain.to_ascii_lowercase();
        if tenants
            .values()
            .any(|t| !t.is_deleted() && t.domain == domain)
        {
            return Err(TenancyError::DomainTaken(domain));
        }

        if let Some(parent_id) = new.parent_id {
            if !tenants.contains_key(&parent_id) {
                return Err(TenancyError::ParentNotFound(parent_id));
            }
        }

        let mut config = self.seeders.seed(&new.template);
        config.set_tier(new.tier);

        let now = Utc::now();
        let tenant = Tenant {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            public_id: Uuid::new_v4(),
            name: new.name,
            domain,
            parent_id: new.parent_id,
            is_active: true,
            config,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        tenants.insert(tenant.id, tenant.clone());
        tracing::info!(
            tenant = %tenant.public_id,
            domain = %tenant.domain,
            template = %new.template,
            "tenant provisioned"
        );

        Ok(tenant)
    }

    /// Get a tenant by internal id
    pub fn get(&self, id: TenantId) -> Option<Tenant> {
        self.tenants.read().get(&id).cloned()
    }

    /// Get a tenant by external-safe id
    pub fn get_by_public_id(&self, public_id: Uuid) -> Option<Tenant> {
        self.tenants
            .read()
            .values()
            .find(|t| t.public_id == public_id)
            .cloned()
    }

    /// Apply an admin update
    pub fn update(&self, id: TenantId, update: TenantUpdate) -> TenancyResult<Tenant> {
        let mut tenants = self.tenants.write();

        if let Some(domain) = &update.domain {
            let domain = domain.to_ascii_lowercase();
            if tenants
                .values()
                .any(|t| t.id != id && !t.is_deleted() && t.domain == domain)
            {
                return Err(TenancyError::DomainTaken(domain));
            }
        }

        let tenant = tenants.get_mut(&id).ok_or(TenancyError::TenantNotFound)?;

        if let Some(name) = update.name {
            tenant.name = name;
        }
        if let Some(domain) = update.domain {
            tenant.domain = domain.to_ascii_lowercase();
        }
        if let Some(is_active) = update.is_active {
            tenant.is_active = is_active;
        }
        if let Some(tier) = update.tier {
            tenant.config.set_tier(Some(tier));
        }
        tenant.updated_at = Utc::now();

        Ok(tenant.clone())
    }

    /// Set one persisted config key
    pub fn set_config_key(
        &self,
        id: TenantId,
        key: &str,
        value: Value,
        visibility: Option<Visibility>,
    ) -> TenancyResult<Tenant> {
        let mut tenants = self.tenants.write();
        let tenant = tenants.get_mut(&id).ok_or(TenancyError::TenantNotFound)?;

        match visibility {
            Some(vis) => tenant.config.set_with_visibility(key, value, vis),
            None => tenant.config.set(key, value),
        }
        tenant.updated_at = Utc::now();

        Ok(tenant.clone())
    }

    /// Remove one persisted config key
    pub fn forget_config_key(&self, id: TenantId, key: &str) -> TenancyResult<Tenant> {
        let mut tenants = self.tenants.write();
        let tenant = tenants.get_mut(&id).ok_or(TenancyError::TenantNotFound)?;

        tenant.config.forget(key);
        tenant.updated_at = Utc::now();

        Ok(tenant.clone())
    }

    /// Soft-delete a tenant; it stops resolving but its row survives
    pub fn soft_delete(&self, id: TenantId) -> TenancyResult<()> {
        let mut tenants = self.tenants.write();
        let tenant = tenants.get_mut(&id).ok_or(TenancyError::TenantNotFound)?;

        tenant.deleted_at = Some(Utc::now());
        tenant.updated_at = Utc::now();
        Ok(())
    }

    /// Undo a soft delete
    pub fn restore(&self, id: TenantId) -> TenancyResult<()> {
        let mut tenants = self.tenants.write();
        let tenant = tenants.get_mut(&id).ok_or(TenancyError::TenantNotFound)?;

        tenant.deleted_at = None;
        tenant.updated_at = Utc::now();
        Ok(())
    }

    /// Administrative hard delete; the config dies with the row
    pub fn purge(&self, id: TenantId) -> TenancyResult<()> {
        self.tenants
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(TenancyError::TenantNotFound)
    }

    /// Number of non-deleted tenants
    pub fn count(&self) -> usize {
        self.tenants
            .read()
            .values()
            .filter(|t| !t.is_deleted())
            .count()
    }
}

impl Default for TenantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantDirectory for TenantRegistry {
    fn find_by_identifier(&self, key: &str) -> Option<Tenant> {
        self.tenants
            .read()
            .values()
            .find(|t| t.is_resolvable() && t.domain.eq_ignore_ascii_case(key))
            .cloned()
    }

    fn all(&self) -> Vec<Tenant> {
        let mut tenants: Vec<Tenant> = self
            .tenants
            .read()
            .values()
            .filter(|t| !t.is_deleted())
            .cloned()
            .collect();
        tenants.sort_by_key(|t| t.id);
        tenants
    }

    fn find_parent(&self, tenant: &Tenant) -> Option<Tenant> {
        self.get(tenant.parent_id?)
    }
}
