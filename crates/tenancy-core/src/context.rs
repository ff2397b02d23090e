//! Per-unit-of-work tenant scope
//!
//! One `TenantContext` exists per unit of work (HTTP request, queued job,
//! console invocation). It is created fresh when the unit starts and
//! dropped when it ends; it must never live in a process-global slot or
//! be shared between concurrent units — that is the single most important
//! invariant of the subsystem.

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{TenancyError, TenancyResult};
use crate::model::Tenant;

/// Holds the resolved tenant for the lifetime of one unit of work
///
/// Interior mutability lets the context ride request extensions behind an
/// `Arc` while staying scoped to its own unit.
#[derive(Debug, Default)]
pub struct TenantContext {
    current: RwLock<Option<Tenant>>,
}

impl TenantContext {
    /// Fresh, empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Establish the tenant for this unit of work. Setting again within
    /// the same unit replaces the tenant.
    pub fn set(&self, tenant: Tenant) {
        *self.current.write() = Some(tenant);
    }

    /// The tenant established for this unit of work
    pub fn get(&self) -> TenancyResult<Tenant> {
        self.current
            .read()
            .clone()
            .ok_or(TenancyError::NoContextTenant)
    }

    /// External-safe id of the context tenant
    pub fn public_id(&self) -> TenancyResult<Uuid> {
        Ok(self.get()?.public_id)
    }

    /// True once `set` has run
    pub fn is_set(&self) -> bool {
        self.current.read().is_some()
    }

    /// Assert the context tenant is the expected one; cross-tenant access
    /// attempts surface as `TenantMismatch`
    pub fn verify(&self, expected: Uuid) -> TenancyResult<()> {
        let actual = self.public_id()?;
        if actual != expected {
            return Err(TenancyError::TenantMismatch { expected, actual });
        }
        Ok(())
    }

    /// Drop the tenant, returning the context to its empty state
    pub fn clear(&self) {
        *self.current.write() = None;
    }
}
