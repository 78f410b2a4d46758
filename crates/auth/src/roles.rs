use serde::{Deserialize, Deserializer, Serialize};

use tenantdesk_core::{DomainError, DomainResult, PermissionId, RoleId};

use crate::ActionSet;

/// A permission attached to a role.
///
/// On the wire the grant's `id` is the id of the catalog permission it
/// refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    #[serde(rename = "id")]
    pub permission_id: PermissionId,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub actions: ActionSet,
}

impl Grant {
    /// Unbound grant appended by the editor before a permission is picked.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        !self.permission_id.is_unassigned()
    }

    /// A grant is submitted only when it references a permission and allows
    /// at least one action.
    pub fn is_complete(&self) -> bool {
        self.is_bound() && !self.actions.is_empty()
    }
}

/// Lifecycle of a role record. Deletion is soft: the record stays on the
/// server with its flag set.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub enum RoleStatus {
    #[default]
    Active,
    Deleted,
}

impl RoleStatus {
    /// `Active → Deleted`. Any other transition is rejected.
    pub fn delete(self) -> DomainResult<RoleStatus> {
        match self {
            RoleStatus::Active => Ok(RoleStatus::Deleted),
            RoleStatus::Deleted => Err(DomainError::invalid_transition("role is already deleted")),
        }
    }
}

impl core::fmt::Display for RoleStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RoleStatus::Active => write!(f, "Active"),
            RoleStatus::Deleted => write!(f, "Deleted"),
        }
    }
}

// `isDeleted` arrives as 0/1, a boolean, or not at all.
fn status_from_flag<'de, D>(deserializer: D) -> Result<RoleStatus, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(true)) => RoleStatus::Deleted,
        Some(Flag::Int(n)) if n != 0 => RoleStatus::Deleted,
        _ => RoleStatus::Active,
    })
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Role detail as returned by `GET /api/roles/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Role {
    pub id: RoleId,
    #[serde(rename = "role")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default)]
    pub grants: Vec<Grant>,
    #[serde(rename = "isDeleted", default, deserialize_with = "status_from_flag")]
    pub status: RoleStatus,
}

impl Role {
    pub fn grant_for(&self, permission_id: PermissionId) -> Option<&Grant> {
        self.grants.iter().find(|g| g.permission_id == permission_id)
    }

    pub fn is_deleted(&self) -> bool {
        self.status == RoleStatus::Deleted
    }
}

/// Row of `GET /api/roles/list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleSummary {
    #[serde(rename = "roleId")]
    pub id: RoleId,
    #[serde(rename = "role")]
    pub name: String,
    #[serde(rename = "isDeleted", default, deserialize_with = "status_from_flag")]
    pub status: RoleStatus,
}
