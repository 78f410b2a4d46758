//! In-memory RBAC editing model.
//!
//! Two editors back the access-control screens:
//!
//! - [`PermissionMatrix`]: per-resource action selection over the permission
//!   catalog (the "permissions" screen).
//! - [`RoleEditor`]: edit buffer for a single role (the "add role" and
//!   "edit role" screens).
//!
//! Neither performs I/O. They produce request bodies; the client crate sends
//! them. Because nothing here is mutated by a network call, a failed save
//! leaves the editor exactly as the user left it.

use std::collections::BTreeMap;

use thiserror::Error;

use tenantdesk_core::{DomainError, PermissionId};

use crate::{
    Action, ActionSet, Grant, GrantRef, Permission, PermissionOperations, PermissionUpdate, Role,
    RoleCreate, RoleUpdate,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("permissions are read-only for tenant origins")]
    ReadOnly,

    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    #[error("unknown permission {0}")]
    UnknownPermission(PermissionId),

    #[error("no pending grant at index {0}")]
    NoSuchPendingGrant(usize),

    #[error("pending grant {0} is not bound to a permission")]
    Unbound(usize),

    #[error("resource '{0}' is already granted on this role")]
    DuplicateResource(String),

    #[error("action '{action}' is not declared by resource '{resource}'")]
    UndeclaredAction { resource: String, action: Action },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Permission matrix
// ─────────────────────────────────────────────────────────────────────────────

/// Selected actions per catalog resource.
///
/// Selection is keyed by resource name, so the order rows are displayed in
/// has no effect on which set a toggle touches.
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    catalog: Vec<Permission>,
    selected: BTreeMap<String, ActionSet>,
    editable: bool,
}

impl PermissionMatrix {
    /// Start from the catalog's currently allowed actions.
    ///
    /// `editable` is false for tenant origins: tenants may view the catalog
    /// but only the administrative console changes it.
    pub fn new(catalog: Vec<Permission>, editable: bool) -> Self {
        let selected = catalog
            .iter()
            .map(|p| (p.resource.clone(), p.actions.clone()))
            .collect();
        Self {
            catalog,
            selected,
            editable,
        }
    }

    pub fn catalog(&self) -> &[Permission] {
        &self.catalog
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn selected(&self, resource: &str) -> Option<&ActionSet> {
        self.selected.get(resource)
    }

    /// Flip `action` for `resource`.
    pub fn toggle_action(&mut self, resource: &str, action: Action) -> Result<&ActionSet, EditorError> {
        let set = self.selection_mut(resource)?;
        set.toggle(action);
        Ok(set)
    }

    /// Toggle between "everything" and "nothing" for `resource`.
    ///
    /// A partially selected resource becomes fully selected; only a fully
    /// selected one is cleared.
    pub fn select_all(&mut self, resource: &str) -> Result<&ActionSet, EditorError> {
        let set = self.selection_mut(resource)?;
        if set.is_full() {
            set.clear();
        } else {
            *set = ActionSet::full();
        }
        Ok(set)
    }

    /// Body for `PUT /api/permissions/update-multiple`.
    ///
    /// Resources without a catalog id are skipped.
    pub fn update_payload(&self) -> Vec<PermissionUpdate> {
        self.selected
            .iter()
            .filter_map(|(resource, actions)| {
                let permission = self.catalog.iter().find(|p| &p.resource == resource)?;
                if permission.id.is_unassigned() {
                    return None;
                }
                Some(PermissionUpdate {
                    permission_id: permission.id,
                    update_data: PermissionOperations {
                        permission_operations: actions.clone(),
                    },
                })
            })
            .collect()
    }

    fn selection_mut(&mut self, resource: &str) -> Result<&mut ActionSet, EditorError> {
        if !self.editable {
            return Err(EditorError::ReadOnly);
        }
        self.selected
            .get_mut(resource)
            .ok_or_else(|| EditorError::UnknownResource(resource.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Role editor
// ─────────────────────────────────────────────────────────────────────────────

/// What saving the editor should send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSubmission {
    Create(RoleCreate),
    Update(RoleUpdate),
}

/// Edit buffer for one role.
///
/// # Invariants
/// - The confirmed role is never modified by edits; only [`RoleEditor::commit`]
///   replaces it.
/// - At most one grant per resource across the draft grants and the pending
///   buffer (checked when a placeholder is bound).
/// - Pending grants only carry actions their permission declares.
#[derive(Debug, Clone)]
pub struct RoleEditor {
    catalog: Vec<Permission>,
    confirmed: Option<Role>,
    name: String,
    description: String,
    draft: Vec<Grant>,
    pending: Vec<Grant>,
}

impl RoleEditor {
    /// Editor for a role that does not exist yet.
    pub fn for_new_role(catalog: Vec<Permission>) -> Self {
        Self {
            catalog,
            confirmed: None,
            name: String::new(),
            description: String::new(),
            draft: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Editor over an existing (confirmed) role.
    pub fn for_role(role: Role, catalog: Vec<Permission>) -> Self {
        Self {
            catalog,
            name: role.name.clone(),
            description: role.description.clone(),
            draft: role.grants.clone(),
            confirmed: Some(role),
            pending: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &[Permission] {
        &self.catalog
    }

    pub fn confirmed(&self) -> Option<&Role> {
        self.confirmed.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Grants of the role as currently edited (excluding the pending buffer).
    pub fn grants(&self) -> &[Grant] {
        &self.draft
    }

    pub fn pending(&self) -> &[Grant] {
        &self.pending
    }

    /// Catalog permissions not yet granted by the draft or bound in the buffer.
    pub fn unassigned_permissions(&self) -> impl Iterator<Item = &Permission> + '_ {
        self.catalog
            .iter()
            .filter(move |p| !self.is_granted(p.id, None))
    }

    /// Append an unbound placeholder to the pending buffer.
    ///
    /// Returns `false` (and changes nothing) when every catalog permission is
    /// already taken, counting placeholders that are still waiting to be bound.
    pub fn add_grant(&mut self) -> bool {
        let open = self.unassigned_permissions().count();
        let unbound = self.pending.iter().filter(|g| !g.is_bound()).count();
        if open <= unbound {
            tracing::warn!(
                role = ?self.confirmed.as_ref().map(|r| r.id.as_str()),
                "no available permissions to add"
            );
            return false;
        }
        self.pending.push(Grant::placeholder());
        true
    }

    /// Bind pending grant `index` to a catalog permission.
    ///
    /// The action set is reset: switching resources never carries selections
    /// over.
    pub fn select_permission_for_grant(
        &mut self,
        index: usize,
        permission_id: PermissionId,
    ) -> Result<&Grant, EditorError> {
        if index >= self.pending.len() {
            return Err(EditorError::NoSuchPendingGrant(index));
        }
        let permission = self
            .permission(permission_id)
            .ok_or(EditorError::UnknownPermission(permission_id))?;
        if self.is_granted(permission_id, Some(index)) {
            return Err(EditorError::DuplicateResource(permission.resource.clone()));
        }
        let resource = permission.resource.clone();

        let grant = &mut self.pending[index];
        grant.permission_id = permission_id;
        grant.resource = resource;
        grant.actions = ActionSet::new();
        Ok(grant)
    }

    /// Flip `action` on pending grant `index`.
    pub fn toggle_pending_action(&mut self, index: usize, action: Action) -> Result<&ActionSet, EditorError> {
        let grant = self
            .pending
            .get(index)
            .ok_or(EditorError::NoSuchPendingGrant(index))?;
        if !grant.is_bound() {
            return Err(EditorError::Unbound(index));
        }
        self.check_declared(grant.permission_id, action)?;

        let grant = &mut self.pending[index];
        grant.actions.toggle(action);
        Ok(&grant.actions)
    }

    /// Drop pending grant `index` from the buffer.
    pub fn remove_pending(&mut self, index: usize) -> Result<Grant, EditorError> {
        if index >= self.pending.len() {
            return Err(EditorError::NoSuchPendingGrant(index));
        }
        Ok(self.pending.remove(index))
    }

    /// Flip `action` on the role's existing grant for `resource`.
    pub fn toggle_grant_action(&mut self, resource: &str, action: Action) -> Result<&ActionSet, EditorError> {
        let position = self
            .draft
            .iter()
            .position(|g| g.resource == resource)
            .ok_or_else(|| EditorError::UnknownResource(resource.to_string()))?;
        self.check_declared(self.draft[position].permission_id, action)?;

        let grant = &mut self.draft[position];
        grant.actions.toggle(action);
        Ok(&grant.actions)
    }

    /// Remove the role's grant referencing `permission_id`. Returns whether a
    /// grant was removed.
    pub fn remove_grant(&mut self, permission_id: PermissionId) -> bool {
        let before = self.draft.len();
        self.draft.retain(|g| g.permission_id != permission_id);
        self.draft.len() != before
    }

    /// Draft grants followed by the buffer, without incomplete entries.
    ///
    /// Placeholders and grants with no actions are dropped silently.
    pub fn merged_grants(&self) -> Vec<Grant> {
        self.draft
            .iter()
            .chain(self.pending.iter())
            .filter(|g| g.is_complete())
            .cloned()
            .collect()
    }

    /// Build the request that persists this editor's state.
    pub fn submission(&self) -> Result<RoleSubmission, EditorError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("role name is required").into());
        }
        let description = self.description.trim().to_string();

        match &self.confirmed {
            Some(role) => Ok(RoleSubmission::Update(RoleUpdate {
                id: role.id.clone(),
                role_name: name.to_string(),
                role_description: description,
                grants: self.merged_grants(),
            })),
            None => {
                if description.is_empty() {
                    return Err(DomainError::validation("role description is required").into());
                }
                Ok(RoleSubmission::Create(RoleCreate {
                    role_name: name.to_string(),
                    role_description: description,
                    grants: self.merged_grants().iter().map(GrantRef::from).collect(),
                }))
            }
        }
    }

    /// Discard every unsaved change.
    pub fn cancel(&mut self) {
        self.pending.clear();
        match &self.confirmed {
            Some(role) => {
                self.name = role.name.clone();
                self.description = role.description.clone();
                self.draft = role.grants.clone();
            }
            None => {
                self.name.clear();
                self.description.clear();
                self.draft.clear();
            }
        }
    }

    /// Adopt `role` as the confirmed state after a successful save.
    pub fn commit(&mut self, role: Role) {
        *self = Self::for_role(role, std::mem::take(&mut self.catalog));
    }

    fn permission(&self, id: PermissionId) -> Option<&Permission> {
        self.catalog.iter().find(|p| p.id == id)
    }

    // Whether `id` is held by a draft grant or by a bound pending grant other
    // than `except`.
    fn is_granted(&self, id: PermissionId, except: Option<usize>) -> bool {
        self.draft.iter().any(|g| g.permission_id == id)
            || self
                .pending
                .iter()
                .enumerate()
                .any(|(i, g)| Some(i) != except && g.is_bound() && g.permission_id == id)
    }

    fn check_declared(&self, id: PermissionId, action: Action) -> Result<(), EditorError> {
        match self.permission(id) {
            Some(p) if !p.declares(action) => Err(EditorError::UndeclaredAction {
                resource: p.resource.clone(),
                action,
            }),
            _ => Ok(()),
        }
    }
}
