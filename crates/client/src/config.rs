//! Client configuration (environment-driven).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use tenantdesk_core::{TenantLabel, TenantResolver};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TENANT_DOMAIN: &str = "app";
pub const DEFAULT_ADMIN_DOMAIN: &str = "admin";
pub const DEFAULT_COOKIE_DOMAIN: &str = "localhost";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to (no trailing slash).
    pub base_url: String,
    pub tenant_domain: String,
    pub admin_domain: String,
    /// Hostname the client acts on behalf of; drives tenant resolution.
    pub origin_host: Option<String>,
    /// Scope of the credential store.
    pub cookie_domain: String,
    /// Durable credential store location. `None` keeps credentials in memory.
    pub credentials_db: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            tenant_domain: DEFAULT_TENANT_DOMAIN.to_string(),
            admin_domain: DEFAULT_ADMIN_DOMAIN.to_string(),
            origin_host: None,
            cookie_domain: DEFAULT_COOKIE_DOMAIN.to_string(),
            credentials_db: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Load from `TENANTDESK_*` environment variables, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("TENANTDESK_API_URL").unwrap_or_else(|_| {
            tracing::warn!("TENANTDESK_API_URL not set; using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });

        let mut config = Self::new(base_url);

        if let Some(tenant) = non_empty_var("TENANTDESK_TENANT_DOMAIN") {
            config.tenant_domain = tenant;
        }
        if let Some(admin) = non_empty_var("TENANTDESK_ADMIN_DOMAIN") {
            config.admin_domain = admin;
        }
        config.origin_host = non_empty_var("TENANTDESK_ORIGIN_HOST");
        config.cookie_domain = non_empty_var("TENANTDESK_COOKIE_DOMAIN")
            .or_else(|| config.origin_host.clone())
            .unwrap_or_else(|| DEFAULT_COOKIE_DOMAIN.to_string());
        config.credentials_db = non_empty_var("TENANTDESK_CREDENTIALS_DB").map(PathBuf::from);

        if let Some(raw) = non_empty_var("TENANTDESK_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("TENANTDESK_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"))?;
            anyhow::ensure!(secs > 0, "TENANTDESK_REQUEST_TIMEOUT_SECS must be positive");
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_tenant_domain(mut self, tenant: impl Into<String>) -> Self {
        self.tenant_domain = tenant.into();
        self
    }

    pub fn with_admin_domain(mut self, admin: impl Into<String>) -> Self {
        self.admin_domain = admin.into();
        self
    }

    pub fn with_origin_host(mut self, host: impl Into<String>) -> Self {
        self.origin_host = Some(host.into());
        self
    }

    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = domain.into();
        self
    }

    pub fn with_credentials_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_db = Some(path.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn resolver(&self) -> TenantResolver {
        TenantResolver::new(self.tenant_domain.clone(), self.admin_domain.clone())
    }

    /// Tenant label for the configured origin.
    pub fn tenant(&self) -> TenantLabel {
        self.resolver().resolve(self.origin_host.as_deref())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
