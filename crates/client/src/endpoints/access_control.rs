//! Permission catalog and role management.
//!
//! Editing happens in the pure editors of `tenantdesk-auth`; these functions
//! only move their payloads over the wire. None of them touch the editor, so
//! a failed save can simply be retried.

use serde::Serialize;
use serde_json::Value;

use tenantdesk_auth::{
    EditorError, Permission, PermissionMatrix, Role, RoleEditor, RoleStatus, RoleSubmission,
    RoleSummary, SoftDelete,
};
use tenantdesk_core::RoleId;

use crate::dto::{Ack, Data};
use crate::endpoints::{role, PERMISSIONS_LIST, PERMISSIONS_UPDATE, ROLES_CREATE, ROLES_LIST};
use crate::http::{ApiClient, Method};
use crate::ApiError;

pub const PERMISSIONS_UPDATED: &str = "Permissions updated successfully";
pub const PERMISSIONS_UPDATE_FAILED: &str = "Failed to update permissions. Please try again.";
pub const ROLE_UPDATED: &str = "Role updated successfully";
pub const ROLE_CREATED: &str = "Role created successfully";
pub const ROLE_SAVE_FAILED: &str = "Failed to update role. Please try again.";
pub const ROLE_DELETE_FAILED: &str = "Failed to delete role";

pub async fn fetch_permissions(client: &ApiClient) -> Result<Vec<Permission>, ApiError> {
    let data: Data<Vec<Permission>> = client.authed(Method::GET, PERMISSIONS_LIST, None).await?;
    tracing::debug!(count = data.data.len(), "permission catalog fetched");
    Ok(data.data)
}

/// Fetch the catalog into a matrix; it is editable only on the
/// administrative origin.
pub async fn open_permission_matrix(client: &ApiClient) -> Result<PermissionMatrix, ApiError> {
    let catalog = fetch_permissions(client).await?;
    Ok(PermissionMatrix::new(catalog, !client.is_multi_tenant()))
}

/// Push the matrix's selection. Returns the confirmation message.
pub async fn save_permissions(client: &ApiClient, matrix: &PermissionMatrix) -> Result<String, ApiError> {
    if !matrix.is_editable() {
        return Err(EditorError::ReadOnly.into());
    }
    let payload = matrix.update_payload();
    if payload.is_empty() {
        return Err(ApiError::Validation("no permissions to update".to_string()));
    }

    let ack: Ack = client
        .authed(Method::PUT, PERMISSIONS_UPDATE, Some(&to_body(&payload)?))
        .await?;
    let message = ack.confirm(PERMISSIONS_UPDATE_FAILED)?;
    tracing::info!(count = payload.len(), "permissions updated");
    Ok(message.unwrap_or_else(|| PERMISSIONS_UPDATED.to_string()))
}

pub async fn fetch_roles(client: &ApiClient) -> Result<Vec<RoleSummary>, ApiError> {
    let data: Data<Vec<RoleSummary>> = client.authed(Method::GET, ROLES_LIST, None).await?;
    Ok(data.data)
}

pub async fn fetch_role(client: &ApiClient, id: &RoleId) -> Result<Role, ApiError> {
    let data: Data<Role> = client.authed(Method::GET, &role(id), None).await?;
    Ok(data.data)
}

/// Create or update the role held by `editor`. Returns the confirmation
/// message; the caller commits the editor once it has the saved role.
pub async fn save_role(client: &ApiClient, editor: &RoleEditor) -> Result<String, ApiError> {
    let (ack, success) = match editor.submission()? {
        RoleSubmission::Update(update) => {
            tracing::info!(role = %update.id, grants = update.grants.len(), "updating role");
            let ack: Ack = client
                .authed(Method::PUT, &role(&update.id), Some(&to_body(&update)?))
                .await?;
            (ack, ROLE_UPDATED)
        }
        RoleSubmission::Create(create) => {
            tracing::info!(grants = create.grants.len(), "creating role");
            let ack: Ack = client
                .authed(Method::POST, ROLES_CREATE, Some(&to_body(&create)?))
                .await?;
            (ack, ROLE_CREATED)
        }
    };
    let message = ack.confirm(ROLE_SAVE_FAILED)?;
    Ok(message.unwrap_or_else(|| success.to_string()))
}

/// Soft-delete a role. The transition is checked locally before any request
/// is sent; the new status is returned on success.
pub async fn delete_role(client: &ApiClient, summary: &RoleSummary) -> Result<RoleStatus, ApiError> {
    let next = summary.status.delete()?;

    let ack: Ack = client
        .authed(Method::DELETE, &role(&summary.id), Some(&to_body(&SoftDelete::new())?))
        .await?;
    ack.confirm(ROLE_DELETE_FAILED)?;
    tracing::info!(role = %summary.id, "role deleted");
    Ok(next)
}

fn to_body<T: Serialize>(payload: &T) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|e| ApiError::Validation(format!("invalid request body: {e}")))
}
