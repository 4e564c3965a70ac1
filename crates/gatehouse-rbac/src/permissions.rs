//! # Permissions
//!
//! Per-resource grants mapping role names to the authorizations they unlock,
//! and the resolution of those grants against a caller's role set.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::authorization::{Authorization, AuthorizationSet};
use crate::role::{normalize_role_name, Role};

/// Immutable role → authorization grants attached to a resource.
///
/// Role names are normalized when the grants are built, so lookups are
/// insensitive to case and surrounding whitespace. An empty value grants
/// nothing.
///
/// # Example
///
/// ```
/// use gatehouse_rbac::{Authorization, AuthorizationSet, Permissions, Role};
/// use std::collections::HashSet;
///
/// let permissions = Permissions::builder()
///     .grant("Ops", [Authorization::Read, Authorization::Write])
///     .grant("admin", Authorization::ALL)
///     .build();
///
/// let roles: HashSet<Role> = [Role::named("ops")].into_iter().collect();
/// let resolved = permissions.resolve(&roles, false);
/// assert_eq!(
///     resolved,
///     AuthorizationSet::from_iter([Authorization::Read, Authorization::Write])
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, AuthorizationSet>",
    into = "BTreeMap<String, AuthorizationSet>"
)]
pub struct Permissions {
    grants: BTreeMap<String, AuthorizationSet>,
}

impl Permissions {
    /// Permissions that grant nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a set of grants.
    pub fn builder() -> PermissionsBuilder {
        PermissionsBuilder::default()
    }

    /// Resolve the authorizations a caller holds on the owning resource.
    ///
    /// Admin callers receive every authorization without the grants being
    /// consulted. Otherwise the grants of every caller role are unioned;
    /// roles without a grant contribute nothing.
    ///
    /// # Arguments
    ///
    /// * `caller_roles` - Roles held by the caller
    /// * `is_admin` - Whether the caller is flagged admin
    ///
    /// # Returns
    ///
    /// The authorizations the caller may exercise
    pub fn resolve(&self, caller_roles: &HashSet<Role>, is_admin: bool) -> AuthorizationSet {
        if is_admin {
            return AuthorizationSet::all();
        }

        let mut resolved = AuthorizationSet::empty();
        for role in caller_roles {
            if let Some(granted) = self.authorizations_for(role.name()) {
                resolved.merge(granted);
            }
        }
        resolved
    }

    /// Grants for a single role name, if any.
    pub fn authorizations_for(&self, role: &str) -> Option<&AuthorizationSet> {
        let name = normalize_role_name(role)?;
        self.grants.get(&name)
    }

    /// Whether any grant is configured.
    ///
    /// Unrestricted resources carry no grants at all.
    pub fn is_restricted(&self) -> bool {
        !self.grants.is_empty()
    }

    /// All role names that hold at least one grant.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }

    /// Get the count of roles with grants.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl From<BTreeMap<String, AuthorizationSet>> for Permissions {
    fn from(raw: BTreeMap<String, AuthorizationSet>) -> Self {
        raw.into_iter()
            .fold(Permissions::builder(), |builder, (role, granted)| {
                builder.grant(role, granted)
            })
            .build()
    }
}

impl From<Permissions> for BTreeMap<String, AuthorizationSet> {
    fn from(permissions: Permissions) -> Self {
        permissions.grants
    }
}

/// Builder for [`Permissions`].
///
/// Duplicate role names (after normalization) have their grants unioned.
/// Blank role names are dropped.
#[derive(Debug, Default)]
pub struct PermissionsBuilder {
    grants: BTreeMap<String, AuthorizationSet>,
}

impl PermissionsBuilder {
    /// Grant `authorizations` to `role`.
    pub fn grant<I>(mut self, role: impl AsRef<str>, authorizations: I) -> Self
    where
        I: IntoIterator<Item = Authorization>,
    {
        if let Some(name) = normalize_role_name(role.as_ref()) {
            self.grants.entry(name).or_default().extend(authorizations);
        }
        self
    }

    /// Finish building.
    pub fn build(self) -> Permissions {
        Permissions {
            grants: self.grants,
        }
    }
}
