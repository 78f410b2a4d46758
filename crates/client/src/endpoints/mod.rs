//! Typed bindings for the backend's REST endpoints.

pub mod access_control;
pub mod tenants;

pub const LOGIN: &str = "/api/users/login";
pub const LOGOUT: &str = "/api/users/logout";
pub const REFRESH_TOKEN: &str = "/api/users/refresh-token";
pub const CHANGE_PASSWORD: &str = "/api/users/changePassword";

pub const PERMISSIONS_LIST: &str = "/api/permissions/list";
pub const PERMISSIONS_UPDATE: &str = "/api/permissions/update-multiple";

pub const ROLES_LIST: &str = "/api/roles/list";
pub const ROLES_CREATE: &str = "/api/roles/create";

pub const CUSTOMER_SIGNUP: &str = "/api/tenants/customer/signup";

/// `GET`/`PUT`/`DELETE` path of a single role.
pub fn role(id: &tenantdesk_core::RoleId) -> String {
    format!("/api/roles/{id}")
}
