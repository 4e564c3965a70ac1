//! # Authorizations
//!
//! Defines the closed set of actions a caller may be authorized to perform
//! on a protected resource, and the set type used to carry them around.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Actions that can be authorized on a resource.
///
/// - **Read**: View the resource and its configuration
/// - **Write**: Modify the resource
/// - **Execute**: Trigger the resource (run a pipeline, deploy to an account)
/// - **Create**: Create new child resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Authorization {
    /// Read/view resource.
    Read,

    /// Modify existing resource.
    Write,

    /// Execute/trigger resource.
    Execute,

    /// Create resources beneath this one.
    Create,
}

impl Authorization {
    /// Every defined authorization kind, in declaration order.
    ///
    /// Kept in sync with the enum by [`Authorization::ordinal`], whose
    /// exhaustive match fails to compile when a variant is added.
    pub const ALL: [Authorization; 4] = [
        Authorization::Read,
        Authorization::Write,
        Authorization::Execute,
        Authorization::Create,
    ];

    /// Position of this kind within [`Authorization::ALL`].
    pub const fn ordinal(&self) -> usize {
        match self {
            Authorization::Read => 0,
            Authorization::Write => 1,
            Authorization::Execute => 2,
            Authorization::Create => 3,
        }
    }

    /// Get the string representation of the authorization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Authorization::Read => "READ",
            Authorization::Write => "WRITE",
            Authorization::Execute => "EXECUTE",
            Authorization::Create => "CREATE",
        }
    }

    /// Parse an authorization from its string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive, surrounding whitespace ignored)
    ///
    /// # Returns
    ///
    /// `Some(Authorization)` if valid, `None` otherwise
    ///
    /// # Example
    ///
    /// ```
    /// use gatehouse_rbac::Authorization;
    ///
    /// assert_eq!(Authorization::parse("read"), Some(Authorization::Read));
    /// assert_eq!(Authorization::parse(" EXECUTE "), Some(Authorization::Execute));
    /// assert_eq!(Authorization::parse("delete"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "READ" => Some(Authorization::Read),
            "WRITE" => Some(Authorization::Write),
            "EXECUTE" => Some(Authorization::Execute),
            "CREATE" => Some(Authorization::Create),
            _ => None,
        }
    }
}

impl std::fmt::Display for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of authorizations granted to a caller or a role.
///
/// Backed by an ordered set so that serialized output and iteration order
/// are stable.
///
/// # Example
///
/// ```
/// use gatehouse_rbac::{Authorization, AuthorizationSet};
///
/// let read_write = AuthorizationSet::from_iter([Authorization::Read, Authorization::Write]);
/// let execute = AuthorizationSet::from_iter([Authorization::Execute]);
///
/// let merged = read_write.union(&execute);
/// assert_eq!(merged.len(), 3);
/// assert!(AuthorizationSet::all().contains_all(&merged));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationSet {
    authorizations: BTreeSet<Authorization>,
}

impl AuthorizationSet {
    /// Create a new empty authorization set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The set of every defined authorization kind.
    pub fn all() -> Self {
        Authorization::ALL.into_iter().collect()
    }

    /// Add an authorization to the set.
    ///
    /// # Returns
    ///
    /// `true` if the authorization was not already present
    pub fn insert(&mut self, authorization: Authorization) -> bool {
        self.authorizations.insert(authorization)
    }

    /// Check if the set contains an authorization.
    pub fn contains(&self, authorization: Authorization) -> bool {
        self.authorizations.contains(&authorization)
    }

    /// Check if this set contains every authorization from another set.
    pub fn contains_all(&self, other: &AuthorizationSet) -> bool {
        other.authorizations.is_subset(&self.authorizations)
    }

    /// Return the union of this set and another.
    pub fn union(&self, other: &AuthorizationSet) -> AuthorizationSet {
        self.authorizations
            .union(&other.authorizations)
            .copied()
            .collect()
    }

    /// Merge another authorization set into this one.
    pub fn merge(&mut self, other: &AuthorizationSet) {
        self.authorizations.extend(other.authorizations.iter().copied());
    }

    /// Check if this set holds every defined authorization kind.
    pub fn is_all(&self) -> bool {
        self.authorizations.len() == Authorization::ALL.len()
    }

    /// Get the count of authorizations.
    pub fn len(&self) -> usize {
        self.authorizations.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.authorizations.is_empty()
    }

    /// Iterate over the authorizations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Authorization> + '_ {
        self.authorizations.iter().copied()
    }
}

impl FromIterator<Authorization> for AuthorizationSet {
    fn from_iter<T: IntoIterator<Item = Authorization>>(iter: T) -> Self {
        Self {
            authorizations: iter.into_iter().collect(),
        }
    }
}

impl Extend<Authorization> for AuthorizationSet {
    fn extend<T: IntoIterator<Item = Authorization>>(&mut self, iter: T) {
        self.authorizations.extend(iter);
    }
}

impl IntoIterator for AuthorizationSet {
    type Item = Authorization;
    type IntoIter = std::collections::btree_set::IntoIter<Authorization>;

    fn into_iter(self) -> Self::IntoIter {
        self.authorizations.into_iter()
    }
}

impl<'a> IntoIterator for &'a AuthorizationSet {
    type Item = Authorization;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, Authorization>>;

    fn into_iter(self) -> Self::IntoIter {
        self.authorizations.iter().copied()
    }
}
