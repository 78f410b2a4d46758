use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use tenantdesk_core::{DomainError, PermissionId};

/// An operation that can be allowed on a resource.
///
/// The set is closed: the backend only knows these four, and an unknown
/// action string is rejected when decoding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    /// The canonical action set, in display order.
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(DomainError::validation(format!("unknown action '{other}'"))),
        }
    }
}

/// Set of allowed actions for a single resource.
///
/// Serialized as a JSON array of action names; `null` decodes as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActionSet(BTreeSet<Action>);

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// All canonical actions.
    pub fn full() -> Self {
        Action::ALL.into_iter().collect()
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0.contains(&action)
    }

    /// Flip membership of `action`. Returns whether it is now present.
    pub fn toggle(&mut self, action: Action) -> bool {
        if self.0.remove(&action) {
            false
        } else {
            self.0.insert(action);
            true
        }
    }

    /// Whether every canonical action is selected.
    pub fn is_full(&self) -> bool {
        Action::ALL.iter().all(|a| self.0.contains(a))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for ActionSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<Vec<Action>> = Option::deserialize(deserializer)?;
        Ok(raw.unwrap_or_default().into_iter().collect())
    }
}

/// A catalog permission: a resource and the actions that may be granted on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub resource: String,
    #[serde(default)]
    pub actions: ActionSet,
}

impl Permission {
    pub fn new(id: impl Into<PermissionId>, resource: impl Into<String>, actions: ActionSet) -> Self {
        Self {
            id: id.into(),
            resource: resource.into(),
            actions,
        }
    }

    pub fn declares(&self, action: Action) -> bool {
        self.actions.contains(action)
    }
}

/// Resource/actions pair as carried in a user's login profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceActions {
    pub resource: String,
    #[serde(default)]
    pub actions: ActionSet,
}
