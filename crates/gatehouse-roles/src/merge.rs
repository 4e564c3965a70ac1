//! Membership normalization and merging.
//!
//! Raw membership strings from service identities or directory searches are
//! normalized the same way (trimmed, lower-cased, blanks dropped,
//! deduplicated) before becoming roles.

use std::collections::HashMap;
use tracing::warn;

use gatehouse_rbac::resources::normalize_memberships;
use gatehouse_rbac::{ExternalIdentity, Role, RoleSource};

use crate::config::DirectoryConfig;
use crate::directory::DirectoryEntry;
use crate::pattern::{unescape_dn_value, Pattern};
use crate::provider::BatchRoles;

/// Turn raw membership strings into deduplicated roles.
///
/// # Examples
///
/// ```
/// use gatehouse_rbac::RoleSource;
/// use gatehouse_roles::merge::roles_from_memberships;
///
/// let roles = roles_from_memberships([" Ops ", "ops", "OPS", ""], RoleSource::Directory);
/// assert_eq!(roles.len(), 1);
/// assert_eq!(roles[0].name(), "ops");
/// ```
pub fn roles_from_memberships<I, S>(memberships: I, source: RoleSource) -> Vec<Role>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    normalize_memberships(memberships)
        .into_iter()
        .map(|name| Role::new(name, source))
        .collect()
}

/// Members found on one group entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedGroup {
    /// `(member id, role)` pairs.
    pub members: Vec<(String, Role)>,
    /// Member values (or whole entries) that could not be mapped.
    pub skipped: usize,
}

/// Maps group entries to `(member id, role)` pairs.
///
/// The role comes from the group's role attribute; member ids are parsed
/// out of the member attribute values with the user DN pattern.
#[derive(Debug, Clone)]
pub struct GroupMemberMapper {
    role_attribute: String,
    user_attribute: String,
    user_dn_pattern: Pattern,
}

impl GroupMemberMapper {
    /// Build a mapper from the directory settings.
    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self {
            role_attribute: config.group_role_attribute.clone(),
            user_attribute: config.group_user_attribute.clone(),
            user_dn_pattern: Pattern::new(&config.user_dn_pattern),
        }
    }

    /// Map one group entry.
    ///
    /// Entries without a usable role name are skipped whole; member values
    /// that do not match the user DN pattern are skipped individually.
    pub fn map_entry(&self, entry: &DirectoryEntry) -> MappedGroup {
        let role = entry
            .first(&self.role_attribute)
            .and_then(|name| Role::parse(name, RoleSource::Directory));
        let Some(role) = role else {
            warn!(dn = %entry.dn, attribute = %self.role_attribute, "Group has no role name, skipping");
            return MappedGroup {
                members: Vec::new(),
                skipped: 1,
            };
        };

        let mut mapped = MappedGroup::default();
        for value in entry.values(&self.user_attribute) {
            match self.user_dn_pattern.parse_first(value) {
                Some(member) => mapped.members.push((unescape_dn_value(&member), role.clone())),
                None => {
                    warn!(
                        group = %role,
                        member = %value,
                        pattern = %self.user_dn_pattern.template(),
                        "Member does not match user DN pattern, skipping"
                    );
                    mapped.skipped += 1;
                }
            }
        }
        mapped
    }
}

/// Group `(member id, role)` pairs by member, keeping only requested ids.
///
/// Member ids match requested ids case-insensitively, as directory DN
/// values do; results are keyed by the requested spelling. Each member's
/// roles are deduplicated in first-seen order.
pub fn group_by_member<I>(pairs: I, requested: &[&str]) -> HashMap<String, Vec<Role>>
where
    I: IntoIterator<Item = (String, Role)>,
{
    let mut by_folded: HashMap<String, Vec<&str>> = HashMap::new();
    for &id in requested {
        let spellings = by_folded.entry(id.to_lowercase()).or_default();
        if !spellings.contains(&id) {
            spellings.push(id);
        }
    }

    let mut grouped: HashMap<String, Vec<Role>> = HashMap::new();
    for (member, role) in pairs {
        let Some(spellings) = by_folded.get(&member.to_lowercase()) else {
            continue;
        };
        for id in spellings {
            let roles = grouped.entry(id.to_string()).or_default();
            if !roles.contains(&role) {
                roles.push(role.clone());
            }
        }
    }
    grouped
}

/// Attach batch results to identities.
///
/// Each resolved identity's roles are replaced, never appended to;
/// identities absent from the result get an empty role set. Identities whose
/// lookup failed are left untouched.
pub fn attach_roles(identities: &mut [ExternalIdentity], batch: &BatchRoles) {
    for identity in identities.iter_mut() {
        if batch.failures.contains_key(identity.id()) {
            continue;
        }
        let roles = batch.roles_for(identity.id()).to_vec();
        identity.set_roles(roles);
    }
}
