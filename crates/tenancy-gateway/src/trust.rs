//! Internal-request trust gate
//!
//! A request counts as internal only if its source IP is allow-listed
//! (or that check is disabled) AND it presents the shared secret (or
//! that check is disabled). The gate decides; it never learns anything
//! about the tenant being asked for.

use std::net::IpAddr;

use ipnetwork::IpNetwork;

use crate::config::GatewayConfig;

/// Header internal callers present the shared secret in
pub const INTERNAL_SECRET_HEADER: &str = "x-internal-auth";

/// Outcome of a trust-gate evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    /// Request counts as internal
    Trusted,
    /// Source IP missing or outside the allowlist
    UntrustedIp,
    /// Secret required but not presented
    MissingSecret,
    /// Presented secret does not match
    BadSecret,
}

impl TrustDecision {
    /// True when the request counts as internal
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Trusted)
    }
}

/// Evaluates whether a request counts as internal
pub struct TrustGate {
    trusted_networks: Vec<IpNetwork>,
    check_source_ip: bool,
    shared_secret: Option<String>,
    check_shared_secret: bool,
}

impl TrustGate {
    /// Build the gate from gateway configuration
    pub fn from_config(config: &GatewayConfig) -> Self {
        if config.check_shared_secret && config.shared_secret.is_none() {
            tracing::warn!(
                "shared-secret check enabled with no secret configured, internal endpoints will refuse everything"
            );
        }

        Self {
            trusted_networks: config.trusted_networks.clone(),
            check_source_ip: config.check_source_ip,
            shared_secret: config.shared_secret.clone(),
            check_shared_secret: config.check_shared_secret,
        }
    }

    /// Evaluate a request's source IP and presented secret
    pub fn evaluate(&self, source: Option<IpAddr>, secret: Option<&str>) -> TrustDecision {
        if self.check_source_ip {
            let allowed = source
                .map(|ip| self.trusted_networks.iter().any(|net| net.contains(ip)))
                .unwrap_or(false);
            if !allowed {
                return TrustDecision::UntrustedIp;
            }
        }

        if self.check_shared_secret {
            match (self.shared_secret.as_deref(), secret) {
                (Some(expected), Some(given)) if expected == given => {}
                (Some(_), Some(_)) => return TrustDecision::BadSecret,
                (Some(_), None) => return TrustDecision::MissingSecret,
                // Misconfiguration: the check is on but no secret exists.
                (None, _) => return TrustDecision::MissingSecret,
            }
        }

        TrustDecision::Trusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(check_ip: bool, secret: Option<&str>, check_secret: bool) -> TrustGate {
        TrustGate::from_config(&GatewayConfig {
            check_source_ip: check_ip,
            shared_secret: secret.map(str::to_string),
            check_shared_secret: check_secret,
            ..GatewayConfig::default()
        })
    }

    fn loopback() -> Option<IpAddr> {
        Some("127.0.0.1".parse().unwrap())
    }

    fn outsider() -> Option<IpAddr> {
        Some("203.0.113.9".parse().unwrap())
    }

    #[test]
    fn test_both_checks_must_pass() {
        let gate = gate(true, Some("sekret"), true);

        assert!(gate.evaluate(loopback(), Some("sekret")).is_trusted());
        assert_eq!(
            gate.evaluate(outsider(), Some("sekret")),
            TrustDecision::UntrustedIp
        );
        assert_eq!(
            gate.evaluate(loopback(), Some("wrong")),
            TrustDecision::BadSecret
        );
        assert_eq!(
            gate.evaluate(loopback(), None),
            TrustDecision::MissingSecret
        );
    }

    #[test]
    fn test_ip_check_can_be_disabled() {
        let gate = gate(false, Some("sekret"), true);
        assert!(gate.evaluate(outsider(), Some("sekret")).is_trusted());
        assert!(gate.evaluate(None, Some("sekret")).is_trusted());
    }

    #[test]
    fn test_secret_check_can_be_disabled() {
        let gate = gate(true, None, false);
        assert!(gate.evaluate(loopback(), None).is_trusted());
        assert_eq!(gate.evaluate(outsider(), None), TrustDecision::UntrustedIp);
    }

    #[test]
    fn test_missing_source_ip_is_untrusted() {
        let gate = gate(true, None, false);
        assert_eq!(gate.evaluate(None, None), TrustDecision::UntrustedIp);
    }

    #[test]
    fn test_enabled_check_without_secret_denies() {
        let gate = gate(false, None, true);
        assert_eq!(gate.evaluate(None, None), TrustDecision::MissingSecret);
        assert_eq!(
            gate.evaluate(None, Some("anything")),
            TrustDecision::MissingSecret
        );
    }
}
