//! External identities
//!
//! An identity whose roles come from outside the permission service. It is
//! created with no roles, populated once by role resolution and then only
//! read.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::role::Role;

/// An identifier together with the roles resolved for it.
///
/// # Examples
///
/// ```
/// use gatehouse_rbac::{ExternalIdentity, Role, RoleSource};
///
/// let mut identity = ExternalIdentity::new("alice");
/// assert!(identity.roles().is_empty());
///
/// identity.set_roles([
///     Role::new("Ops", RoleSource::Directory),
///     Role::new("ops ", RoleSource::Directory),
/// ]);
/// assert_eq!(identity.roles().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    id: String,
    #[serde(default)]
    roles: Vec<Role>,
}

impl ExternalIdentity {
    /// Creates an identity with no roles.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
        }
    }

    /// Replace the roles, see [`ExternalIdentity::set_roles`].
    pub fn with_roles<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        self.set_roles(roles);
        self
    }

    /// Replace any previously assigned roles.
    ///
    /// Roles with blank names are dropped and duplicates (by normalized
    /// name) keep their first occurrence.
    pub fn set_roles<I>(&mut self, roles: I)
    where
        I: IntoIterator<Item = Role>,
    {
        let mut seen = HashSet::new();
        self.roles = roles
            .into_iter()
            .filter(|role| !role.name().is_empty())
            .filter(|role| seen.insert(role.name().to_string()))
            .collect();
    }

    /// Identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Assigned roles in discovery order.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Assigned roles as a set, ready for view resolution.
    pub fn role_set(&self) -> HashSet<Role> {
        self.roles.iter().cloned().collect()
    }
}
