//! Tenant resolution from the request origin.
//!
//! A tenant is addressed by subdomain: `acme.bookings.example` belongs to the
//! tenant `acme`. Hosts without a subdomain fall back to a configured default
//! label, and one configured label is reserved for the administrative (root)
//! console, which is not a tenant.

use serde::{Deserialize, Serialize};

/// Label identifying a tenant (the subdomain prefix of the origin host).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantLabel(String);

impl TenantLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TenantLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives tenant labels from hostnames.
///
/// - No IO
/// - Deterministic
/// - Callable without an origin (falls back to the default tenant)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantResolver {
    default_tenant: TenantLabel,
    admin_domain: TenantLabel,
}

impl TenantResolver {
    pub fn new(default_tenant: impl Into<String>, admin_domain: impl Into<String>) -> Self {
        Self {
            default_tenant: TenantLabel::new(default_tenant),
            admin_domain: TenantLabel::new(admin_domain),
        }
    }

    pub fn default_tenant(&self) -> &TenantLabel {
        &self.default_tenant
    }

    pub fn admin_domain(&self) -> &TenantLabel {
        &self.admin_domain
    }

    /// Resolve the tenant label for `hostname`.
    ///
    /// With more than two dot-separated labels, everything but the last two
    /// (domain + TLD) is the tenant. Otherwise the default tenant applies.
    pub fn resolve(&self, hostname: Option<&str>) -> TenantLabel {
        let Some(hostname) = hostname else {
            return self.default_tenant.clone();
        };

        let parts: Vec<&str> = hostname.split('.').collect();
        if parts.len() > 2 {
            TenantLabel::new(parts[..parts.len() - 2].join("."))
        } else {
            self.default_tenant.clone()
        }
    }

    /// Whether requests for `label` are tenant-scoped (i.e. need the
    /// `x-request-origin` header).
    pub fn is_multi_tenant(&self, label: &TenantLabel) -> bool {
        label != &self.admin_domain
    }
}
