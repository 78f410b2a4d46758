//! `tenantdesk-auth`: pure RBAC and credential model.
//!
//! This crate is intentionally decoupled from HTTP and storage: everything
//! here can be exercised without a runtime.

pub mod editor;
pub mod payload;
pub mod permissions;
pub mod profile;
pub mod roles;
pub mod tokens;

pub use editor::{EditorError, PermissionMatrix, RoleEditor, RoleSubmission};
pub use payload::{GrantRef, PermissionOperations, PermissionUpdate, RoleCreate, RoleUpdate, SoftDelete};
pub use permissions::{Action, ActionSet, Permission, ResourceActions};
pub use profile::{CredentialsError, LoginCredentials, PasswordChange, UserProfile};
pub use roles::{Grant, Role, RoleStatus, RoleSummary};
pub use tokens::{ExpirySeconds, RefreshedTokens, TokenPair, TokenPairError, TtlDays, MAX_EXPIRY_SECONDS};
