//! Roles held by callers
//!
//! A role is a named group membership. Names are normalized on
//! construction (trimmed, lower-cased) and a role is identified by its
//! normalized name alone; the provenance tag is informational.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Where a role assignment came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleSource {
    /// Asserted by an external caller (e.g. a service identity's memberships).
    External,

    /// Resolved from a directory group search.
    Directory,

    /// Statically assigned by configuration.
    #[default]
    Static,
}

impl RoleSource {
    /// Get string representation of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Directory => "directory",
            Self::Static => "static",
        }
    }

    /// Parse a source from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "external" => Some(Self::External),
            "directory" | "ldap" => Some(Self::Directory),
            "static" | "file" => Some(Self::Static),
            _ => None,
        }
    }
}

/// Normalize a raw role or membership name.
///
/// Trims surrounding whitespace and lower-cases the remainder.
///
/// # Returns
///
/// `None` when nothing is left after trimming
///
/// # Examples
///
/// ```
/// use gatehouse_rbac::role::normalize_role_name;
///
/// assert_eq!(normalize_role_name("  Ops "), Some("ops".to_string()));
/// assert_eq!(normalize_role_name("   "), None);
/// ```
pub fn normalize_role_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// A role held by a caller, tagged with its provenance.
///
/// Equality and hashing only consider the normalized name, so a
/// `HashSet<Role>` never holds two roles that would unlock the same grants.
///
/// # Examples
///
/// ```
/// use gatehouse_rbac::{Role, RoleSource};
///
/// let directory = Role::new(" Ops ", RoleSource::Directory);
/// let external = Role::new("ops", RoleSource::External);
///
/// assert_eq!(directory.name(), "ops");
/// assert_eq!(directory, external);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RoleRepr")]
pub struct Role {
    name: String,
    source: RoleSource,
}

/// Wire shape of a role; names are normalized on the way in.
#[derive(Deserialize)]
struct RoleRepr {
    name: String,
    #[serde(default)]
    source: RoleSource,
}

impl From<RoleRepr> for Role {
    fn from(repr: RoleRepr) -> Self {
        Role::new(repr.name, repr.source)
    }
}

impl Role {
    /// Creates a role, normalizing its name.
    ///
    /// An all-whitespace name yields a role with an empty name; use
    /// [`Role::parse`] to reject those.
    pub fn new(name: impl AsRef<str>, source: RoleSource) -> Self {
        Self {
            name: name.as_ref().trim().to_lowercase(),
            source,
        }
    }

    /// Creates a role from a raw name, rejecting blank names.
    pub fn parse(raw: &str, source: RoleSource) -> Option<Self> {
        normalize_role_name(raw).map(|name| Self { name, source })
    }

    /// Creates a statically assigned role.
    pub fn named(name: impl AsRef<str>) -> Self {
        Self::new(name, RoleSource::Static)
    }

    /// Normalized role name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provenance of this role.
    pub fn source(&self) -> RoleSource {
        self.source
    }
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Role {}

impl Hash for Role {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_role_name_is_normalized() {
        let role = Role::new("  Deploy-Team\t", RoleSource::Directory);
        assert_eq!(role.name(), "deploy-team");
        assert_eq!(role.source(), RoleSource::Directory);
    }

    #[test]
    fn test_role_equality_ignores_source() {
        let a = Role::new("ops", RoleSource::Directory);
        let b = Role::new("OPS", RoleSource::External);
        assert_eq!(a, b);

        let set: HashSet<Role> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_role_parse_rejects_blank() {
        assert!(Role::parse("", RoleSource::External).is_none());
        assert!(Role::parse("  ", RoleSource::External).is_none());
        assert_eq!(
            Role::parse(" Admins ", RoleSource::External).map(|r| r.name().to_string()),
            Some("admins".to_string())
        );
    }

    #[test]
    fn test_role_source_parse() {
        assert_eq!(RoleSource::parse("LDAP"), Some(RoleSource::Directory));
        assert_eq!(RoleSource::parse("external"), Some(RoleSource::External));
        assert_eq!(RoleSource::parse("file"), Some(RoleSource::Static));
        assert_eq!(RoleSource::parse("github"), None);
    }

    #[test]
    fn test_role_deserializes_without_source() {
        let role: Role = serde_json::from_str(r#"{"name":" Ops "}"#).unwrap();
        assert_eq!(role.name(), "ops");
        assert_eq!(role.source(), RoleSource::Static);
    }
}
