//! Tenant endpoint handlers

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, OriginalUri, Query};
use axum::http::{header, HeaderMap, Uri};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use tenancy_core::{DumpMode, RequestMeta, TenantContext, TenantDump};

use crate::models::{ApiError, ErrorBody};
use crate::trust::INTERNAL_SECRET_HEADER;
use crate::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok" when the process is up
    pub status: String,
    /// Crate version
    pub version: String,
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Gateway is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Protected-mode dump of the resolved tenant (internal callers only)
#[utoipa::path(
    get,
    path = "/api/v1/tenant/protected",
    responses(
        (status = 200, description = "Protected tenant dump", body = TenantDump),
        (status = 403, description = "Caller is not internal", body = ErrorBody),
        (status = 404, description = "No tenant matches the request", body = ErrorBody)
    ),
    tag = "tenant"
)]
pub async fn protected_dump(
    Extension(state): Extension<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<TenantDump>, ApiError> {
    require_internal(&state, &headers, connect.as_ref())?;

    let tenant = state.resolver.resolve_request(&request_meta(&headers, &uri))?;

    // One context per request; established before any tenant-scoped read.
    let context = TenantContext::new();
    context.set(tenant);
    let tenant = context.get()?;

    let dump = state.dumps.dump(&tenant, DumpMode::Protected)?;
    Ok(Json(dump))
}

/// Cached protected-mode dumps of all tenants (internal callers only,
/// feature-gated)
#[utoipa::path(
    get,
    path = "/api/v1/tenant/cache",
    responses(
        (status = 200, description = "All tenant dumps", body = [TenantDump]),
        (status = 403, description = "Caller is not internal", body = ErrorBody),
        (status = 404, description = "Endpoint disabled", body = ErrorBody)
    ),
    tag = "tenant"
)]
pub async fn cached_dumps(
    Extension(state): Extension<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<Vec<TenantDump>>, ApiError> {
    require_internal(&state, &headers, connect.as_ref())?;

    if !state.config.cache_endpoint_enabled {
        return Err(ApiError::not_found());
    }

    Ok(Json(state.dumps.dump_all().as_ref().clone()))
}

/// Query parameters of the public config endpoint
#[derive(Deserialize)]
pub struct PublicQuery {
    domain: String,
}

/// Public-mode dump of a tenant, resolved by domain (unauthenticated)
#[utoipa::path(
    get,
    path = "/api/v1/tenant/public",
    params(("domain" = String, Query, description = "Tenant domain")),
    responses(
        (status = 200, description = "Public tenant dump", body = TenantDump),
        (status = 404, description = "Unknown tenant or public config disabled", body = ErrorBody)
    ),
    tag = "tenant"
)]
pub async fn public_dump(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<PublicQuery>,
) -> Result<Json<TenantDump>, ApiError> {
    let result = state
        .resolver
        .resolve(&query.domain.to_ascii_lowercase())
        .and_then(|tenant| state.dumps.dump(&tenant, DumpMode::Public));

    // Every failure is the same 404: a tenant that has not opted in must
    // be indistinguishable from one that does not exist.
    match result {
        Ok(dump) => Ok(Json(dump)),
        Err(err) => {
            tracing::debug!(error = %err, "public config refused");
            Err(ApiError::not_found())
        }
    }
}

fn require_internal(
    state: &AppState,
    headers: &HeaderMap,
    connect: Option<&ConnectInfo<SocketAddr>>,
) -> Result<(), ApiError> {
    let secret = headers
        .get(INTERNAL_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    let decision = state.trust.evaluate(source_ip(headers, connect), secret);

    if decision.is_trusted() {
        Ok(())
    } else {
        tracing::warn!(?decision, "internal endpoint refused");
        Err(ApiError::forbidden())
    }
}

// Proxy-forwarded address first, then the socket peer.
fn source_ip(headers: &HeaderMap, connect: Option<&ConnectInfo<SocketAddr>>) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(ip) = first.trim().parse() {
                return Some(ip);
            }
        }
    }

    connect.map(|ConnectInfo(addr)| addr.ip())
}

fn request_meta(headers: &HeaderMap, uri: &Uri) -> RequestMeta {
    RequestMeta {
        host: headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
    }
}
