//! Gateway configuration

use std::net::SocketAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use tenancy_core::ResolutionStrategy;

/// Gateway configuration
///
/// The IP and shared-secret checks of the internal trust gate are
/// independently toggleable so development setups can relax one without
/// losing the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Route prefix for the tenant endpoints
    pub prefix: String,
    /// Networks whose requests may count as internal
    pub trusted_networks: Vec<IpNetwork>,
    /// Enforce the source-IP allowlist
    pub check_source_ip: bool,
    /// Secret internal callers must present in `x-internal-auth`
    pub shared_secret: Option<String>,
    /// Enforce the shared-secret header
    pub check_shared_secret: bool,
    /// Expose the all-tenants cache endpoint
    pub cache_endpoint_enabled: bool,
    /// How requests map to a resolution key
    pub resolution: ResolutionStrategy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            prefix: "/api/v1/tenant".into(),
            trusted_networks: default_trusted_networks(),
            check_source_ip: true,
            shared_secret: None,
            check_shared_secret: true,
            cache_endpoint_enabled: false,
            resolution: ResolutionStrategy::Domain,
        }
    }
}

fn default_trusted_networks() -> Vec<IpNetwork> {
    ["127.0.0.0/8", "::1/128"]
        .iter()
        .map(|net| net.parse().expect("static CIDR"))
        .collect()
}
