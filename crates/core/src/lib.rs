//! `tenantdesk-core`: shared building blocks.
//!
//! This crate contains **pure** primitives (no I/O): the error model,
//! strongly-typed identifiers and tenant resolution.

pub mod error;
pub mod id;
pub mod tenant;

pub use error::{DomainError, DomainResult};
pub use id::{PermissionId, RoleId};
pub use tenant::{TenantLabel, TenantResolver};
