//! Request bodies produced by the RBAC editors.

use serde::Serialize;

use tenantdesk_core::{PermissionId, RoleId};

use crate::{ActionSet, Grant};

/// Element of the `PUT /api/permissions/update-multiple` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionUpdate {
    pub permission_id: PermissionId,
    pub update_data: PermissionOperations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOperations {
    pub permission_operations: ActionSet,
}

/// Body of `PUT /api/roles/{id}`: the full role with its merged grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdate {
    pub id: RoleId,
    pub role_name: String,
    pub role_description: String,
    pub grants: Vec<Grant>,
}

/// Grant reference inside a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantRef {
    pub id: PermissionId,
    pub actions: ActionSet,
}

impl From<&Grant> for GrantRef {
    fn from(grant: &Grant) -> Self {
        Self {
            id: grant.permission_id,
            actions: grant.actions.clone(),
        }
    }
}

/// Body of `POST /api/roles/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCreate {
    pub role_name: String,
    pub role_description: String,
    pub grants: Vec<GrantRef>,
}

/// Body of `DELETE /api/roles/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftDelete {
    is_deleted: u8,
}

impl SoftDelete {
    pub fn new() -> Self {
        Self { is_deleted: 1 }
    }
}

impl Default for SoftDelete {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Action;

    #[test]
    fn soft_delete_sets_flag() {
        assert_eq!(
            serde_json::to_value(SoftDelete::new()).unwrap(),
            serde_json::json!({ "isDeleted": 1 })
        );
    }

    #[test]
    fn permission_update_shape() {
        let update = PermissionUpdate {
            permission_id: PermissionId::new(3),
            update_data: PermissionOperations {
                permission_operations: [Action::Read, Action::Create].into_iter().collect(),
            },
        };
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            serde_json::json!({
                "permissionId": 3,
                "updateData": { "permissionOperations": ["create", "read"] }
            })
        );
    }
}
