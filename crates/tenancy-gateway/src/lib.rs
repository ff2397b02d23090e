//! OpenTenancy Gateway
//!
//! HTTP surface over the tenant configuration pipeline:
//! - `GET {prefix}/protected` — internal-only, protected-mode dump of the
//!   resolved tenant
//! - `GET {prefix}/cache` — internal-only, feature-gated cached list of
//!   all tenant dumps
//! - `GET {prefix}/public?domain=..` — unauthenticated, public-mode dump
//!   for tenants that opted in
//!
//! "Internal" is decided by the trust gate: allow-listed source IP and a
//! shared-secret header, each independently toggleable.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod trust;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tenancy_core::{
    ConfigProviderRegistry, ConfigurationPipeline, TenantDirectory, TenantDump, TenantDumpService,
    TenantRegistry, TenantResolver,
};

pub use config::GatewayConfig;
pub use trust::{TrustGate, INTERNAL_SECRET_HEADER};

/// Application state shared across handlers
pub struct AppState {
    /// Tenant store and provisioning
    pub registry: Arc<TenantRegistry>,
    /// Cached tenant resolution
    pub resolver: TenantResolver,
    /// Dump assembly and the all-tenants cache
    pub dumps: TenantDumpService,
    /// Internal-request trust gate
    pub trust: TrustGate,
    /// Gateway configuration
    pub config: GatewayConfig,
}

impl AppState {
    /// State with a fresh registry and the built-in pipes, providers and
    /// seeders
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(TenantRegistry::new()),
            ConfigurationPipeline::with_defaults(),
            ConfigProviderRegistry::with_defaults(),
        )
    }

    /// State over an existing registry and explicit pipeline/providers
    pub fn with_parts(
        config: GatewayConfig,
        registry: Arc<TenantRegistry>,
        pipeline: ConfigurationPipeline,
        providers: ConfigProviderRegistry,
    ) -> Self {
        let directory: Arc<dyn TenantDirectory> = registry.clone();
        let resolver = TenantResolver::new(directory.clone(), config.resolution.clone());
        let dumps = TenantDumpService::new(directory, pipeline, providers);
        let trust = TrustGate::from_config(&config);

        Self {
            registry,
            resolver,
            dumps,
            trust,
            config,
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "OpenTenancy Gateway",
        description = "Tenant resolution and configuration API",
        license(name = "Apache-2.0")
    ),
    paths(
        handlers::health,
        handlers::protected_dump,
        handlers::cached_dumps,
        handlers::public_dump,
    ),
    components(schemas(TenantDump, models::ErrorBody, handlers::HealthResponse)),
    tags(
        (name = "health", description = "Health check"),
        (name = "tenant", description = "Tenant configuration dumps")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: Arc<AppState>) -> Router {
    let tenant_routes = Router::new()
        .route("/protected", get(handlers::protected_dump))
        .route("/cache", get(handlers::cached_dumps))
        .route("/public", get(handlers::public_dump));

    let prefix = state.config.prefix.clone();

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .nest(&prefix, tenant_routes)
        .layer(axum::middleware::from_fn(middleware::logging))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

/// Start the gateway server
pub async fn serve(config: GatewayConfig) -> Result<(), std::io::Error> {
    serve_with_state(Arc::new(AppState::new(config))).await
}

/// Start the gateway server over prebuilt state
pub async fn serve_with_state(state: Arc<AppState>) -> Result<(), std::io::Error> {
    let addr = state.config.bind;
    let app = build_router(state);

    tracing::info!("tenancy gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state() {
        let state = AppState::new(GatewayConfig::default());
        assert_eq!(state.registry.count(), 0);
    }
}
