//! OpenTenancy Core
//!
//! Tenant resolution and configuration pipeline for multi-tenant SaaS.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    TENANT CONFIGURATION PIPELINE                        │
//! │                                                                         │
//! │  provisioning time                                                      │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐                              │
//! │  │ Seeder 1 │→ │ Seeder 2 │→ │  Shared  │→  persisted TenantConfig     │
//! │  │ (prio 10)│  │ (prio 20)│  │ seeders  │   (value map + visibility)   │
//! │  └──────────┘  └──────────┘  └──────────┘                              │
//! │                                                                         │
//! │  request time                                                           │
//! │  ┌──────────┐   ┌─────────┐   ┌───────────────┐   ┌────────────────┐   │
//! │  │ Resolver │ → │ Context │ → │ Config pipes  │ → │   Providers    │   │
//! │  │ (cache)  │   │ (scoped)│   │ (overrides)   │   │ (enhancement)  │   │
//! │  └──────────┘   └─────────┘   └───────────────┘   └───────┬────────┘   │
//! │                                                           │            │
//! │  ┌────────────────────────────────────────────────────────▼────────┐   │
//! │  │                      VISIBILITY FILTER                          │   │
//! │  │   public → browser | protected → SSR | private → never leaves   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod dump;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod seed;

pub use config::{ConfigFragment, TenantConfig, Visibility, VISIBILITY_KEY};
pub use context::TenantContext;
pub use dump::{DumpMode, TenantDump, TenantDumpService, DUMP_CACHE_TTL, PUBLIC_API_FLAG};
pub use error::{TenancyError, TenancyResult};
pub use model::{NewTenant, Tenant, TenantId, TenantUpdate};
pub use pipeline::{ConfigPipe, ConfigurationPipeline, ResolvedConfig};
pub use provider::{ConfigProvider, ConfigProviderRegistry};
pub use registry::TenantRegistry;
pub use resolver::{
    RequestMeta, ResolutionStrategy, TenantDirectory, TenantResolver, DEFAULT_RESOLVER_TTL,
};
pub use seed::{SeederRegistry, SharedSeeder, TemplateSeeder};
