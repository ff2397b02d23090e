//! Error types for OpenTenancy

use thiserror::Error;
use uuid::Uuid;

/// OpenTenancy error type
#[derive(Error, Debug)]
pub enum TenancyError {
    /// No active, non-deleted tenant matches the resolution key
    #[error("tenant not found")]
    TenantNotFound,

    /// Context tenant disagrees with the expected tenant
    #[error("tenant mismatch: expected {expected}, got {actual}")]
    TenantMismatch {
        /// The tenant the caller expected to be active
        expected: Uuid,
        /// The tenant actually held by the context
        actual: Uuid,
    },

    /// `TenantContext::get` called before `set`
    #[error("no tenant in context")]
    NoContextTenant,

    /// Persisted config JSON does not match any known shape
    #[error("invalid config shape: {0}")]
    InvalidConfigShape(String),

    /// Domain already registered to another tenant
    #[error("domain already taken: {0}")]
    DomainTaken(String),

    /// `parent_id` does not reference an existing tenant
    #[error("parent tenant not found: {0}")]
    ParentNotFound(u64),

    /// A configuration pipe aborted the resolution pass
    #[error("config pipe '{pipe}' failed: {reason}")]
    PipeFailed {
        /// Name of the failing pipe
        pipe: &'static str,
        /// What went wrong
        reason: String,
    },
}

/// Result type for OpenTenancy
pub type TenancyResult<T> = Result<T, TenancyError>;
