//! Route gating by refresh-token presence.

/// Path prefixes that require a signed-in user.
pub const PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/profile",
    "/settings",
    "/tables",
    "/forms",
    "/calendar",
    "/auth",
    "/chart",
    "/roles",
    "/permissions",
    "/customers",
    "/manageCompany",
    "/staff",
    "/provider",
    "/invoice",
    "/services",
    "/categories",
    "/bookings",
    "/reports",
    "/offers",
];

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    protected: Vec<String>,
    login_path: String,
    home_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            protected: PROTECTED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            login_path: LOGIN_PATH.to_string(),
            home_path: HOME_PATH.to_string(),
        }
    }
}

impl RouteGuard {
    pub fn new(protected: impl IntoIterator<Item = impl Into<String>>, login_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        Self {
            protected: protected.into_iter().map(Into::into).collect(),
            login_path: login_path.into(),
            home_path: home_path.into(),
        }
    }

    pub fn decide(&self, path: &str, has_refresh_token: bool) -> RouteDecision {
        if path == self.login_path {
            return if has_refresh_token {
                RouteDecision::Redirect(self.home_path.clone())
            } else {
                RouteDecision::Allow
            };
        }
        if !has_refresh_token && self.is_protected(path) {
            return RouteDecision::Redirect(self.login_path.clone());
        }
        RouteDecision::Allow
    }

    fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}
