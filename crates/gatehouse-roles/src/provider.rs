//! Directory-backed role resolution.
//!
//! [`DirectoryRolesProvider`] resolves the group memberships of one identity
//! with a user DN lookup followed by a group search, and of a batch of
//! identities either the same way per identity (fan-out) or with a single
//! scan over every group (bulk).

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use gatehouse_rbac::{ExternalIdentity, Role, RoleSource};

use crate::config::DirectoryConfig;
use crate::directory::DirectoryBackend;
use crate::error::{RoleError, RoleResult};
use crate::merge::{attach_roles, group_by_member, roles_from_memberships, GroupMemberMapper};
use crate::pattern::{assemble_full_dn, escape_dn_value, Pattern};
use crate::strategy::LoadStrategy;

/// Outcome of a batch role load.
///
/// Only identities with at least one role appear in `roles`; read missing
/// ids as having no roles. Identities whose lookup failed appear in
/// `failures` instead, so "no roles" and "unknown roles" stay distinct.
#[derive(Debug, Default)]
pub struct BatchRoles {
    /// Strategy used, or `None` when group lookups are disabled.
    pub strategy: Option<LoadStrategy>,
    /// Roles per identity id.
    pub roles: HashMap<String, Vec<Role>>,
    /// Lookup failures per identity id (fan-out only).
    pub failures: HashMap<String, RoleError>,
    /// Group entries or member values that could not be mapped (bulk only).
    pub skipped_members: usize,
}

impl BatchRoles {
    /// Create an empty outcome.
    pub fn new(strategy: Option<LoadStrategy>) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    /// Roles resolved for `id`; empty if none were found.
    pub fn roles_for(&self, id: &str) -> &[Role] {
        self.roles.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether every identity was resolved.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves the external roles of identities.
#[async_trait]
pub trait RolesProvider: Send + Sync {
    /// Load the roles of a single identity, in discovery order.
    async fn load_roles(&self, identity: &ExternalIdentity) -> RoleResult<Vec<Role>>;

    /// Load the roles of a batch of identities.
    ///
    /// Identities are keyed by id; repeated ids are resolved once.
    async fn multi_load_roles(&self, identities: &[ExternalIdentity]) -> RoleResult<BatchRoles>;

    /// Load a batch and attach the results to the identities.
    ///
    /// See [`attach_roles`] for how results replace existing roles.
    async fn resolve_identities(
        &self,
        identities: &mut [ExternalIdentity],
    ) -> RoleResult<BatchRoles> {
        let batch = self.multi_load_roles(identities).await?;
        attach_roles(identities, &batch);
        Ok(batch)
    }
}

/// Roles provider backed by a directory's group memberships.
///
/// # Example
///
/// ```rust,no_run
/// use gatehouse_rbac::ExternalIdentity;
/// use gatehouse_roles::{DirectoryConfig, DirectoryRolesProvider, MemoryDirectory, RolesProvider};
/// use std::sync::Arc;
///
/// async fn example() {
///     let provider = DirectoryRolesProvider::try_new(
///         DirectoryConfig::from_env(),
///         Arc::new(MemoryDirectory::new()),
///     )
///     .unwrap();
///
///     let roles = provider.load_roles(&ExternalIdentity::new("alice")).await.unwrap();
///     println!("alice holds {} roles", roles.len());
/// }
/// ```
#[derive(Clone)]
pub struct DirectoryRolesProvider {
    config: DirectoryConfig,
    backend: Arc<dyn DirectoryBackend>,
}

impl std::fmt::Debug for DirectoryRolesProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryRolesProvider")
            .field("config", &self.config)
            .finish()
    }
}

impl DirectoryRolesProvider {
    /// Create a provider without validating the configuration.
    pub fn new(config: DirectoryConfig, backend: Arc<dyn DirectoryBackend>) -> Self {
        Self { config, backend }
    }

    /// Create a provider after validating the configuration.
    pub fn try_new(config: DirectoryConfig, backend: Arc<dyn DirectoryBackend>) -> RoleResult<Self> {
        config.validate()?;
        Ok(Self::new(config, backend))
    }

    /// Configuration in use.
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Strategy a batch of `identity_count` identities would use.
    pub fn strategy_for(&self, identity_count: usize) -> LoadStrategy {
        LoadStrategy::choose(
            identity_count,
            self.config.bulk_threshold,
            self.config.bulk_capable(),
        )
    }

    /// Resolve a user id to its full DN.
    ///
    /// `Ok(None)` means the id has no directory entry of its own (typically
    /// a service identity); backend failures are propagated.
    async fn user_full_dn(&self, user_id: &str) -> RoleResult<Option<String>> {
        let root_dn = self.config.root_dn();
        debug!(root_dn, "Resolving user DN");

        let encoded = escape_dn_value(user_id);
        let relative_dn = if self.config.user_search_filter.trim().is_empty() {
            Pattern::new(&self.config.user_dn_pattern).format(&[encoded])
        } else {
            let found = self
                .backend
                .search_for_single_entry(
                    &self.config.user_search_base,
                    &self.config.user_search_filter,
                    &[encoded],
                )
                .await?;
            match found {
                Some(dn) => dn,
                None => {
                    error!(user_id, "Unable to find a single user entry");
                    return Ok(None);
                }
            }
        };
        debug!(relative_dn = %relative_dn, "User portion");

        match assemble_full_dn(root_dn, &relative_dn) {
            Some(full_dn) => {
                debug!(full_dn = %full_dn, "Full user DN");
                Ok(Some(full_dn))
            }
            None => {
                error!(root_dn, relative_dn = %relative_dn, "Could not assemble full user DN");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, ids), fields(identities = ids.len()))]
    async fn bulk_load(&self, ids: &[&str]) -> RoleResult<BatchRoles> {
        let filter = Pattern::new(&self.config.group_search_filter).format(&["*", "*"]);
        debug!(
            group_search_base = %self.config.group_search_base,
            filter = %filter,
            "Scanning all groups"
        );

        let entries = self
            .backend
            .search_entries(&self.config.group_search_base, &filter)
            .await?;

        let mapper = GroupMemberMapper::from_config(&self.config);
        let mut skipped = 0;
        let pairs: Vec<(String, Role)> = entries
            .iter()
            .flat_map(|entry| {
                let mapped = mapper.map_entry(entry);
                skipped += mapped.skipped;
                mapped.members
            })
            .collect();

        let mut batch = BatchRoles::new(Some(LoadStrategy::Bulk));
        batch.roles = group_by_member(pairs, ids);
        batch.skipped_members = skipped;

        if skipped > 0 {
            warn!(skipped, "Skipped unmappable group members");
        }
        debug!(
            groups = entries.len(),
            resolved = batch.roles.len(),
            "Bulk load complete"
        );
        Ok(batch)
    }

    #[instrument(skip(self, identities), fields(identities = identities.len()))]
    async fn fan_out_load(&self, identities: &[&ExternalIdentity]) -> BatchRoles {
        let concurrency = self.config.fan_out_concurrency.max(1);
        let lookups: Vec<_> = identities
            .iter()
            .map(|identity| async move {
                (identity.id().to_string(), self.load_roles(identity).await)
            })
            .collect();
        let results: Vec<(String, RoleResult<Vec<Role>>)> = stream::iter(lookups)
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut batch = BatchRoles::new(Some(LoadStrategy::FanOut));
        for (id, result) in results {
            match result {
                Ok(roles) if roles.is_empty() => {}
                Ok(roles) => {
                    batch.roles.insert(id, roles);
                }
                Err(e) => {
                    warn!(user_id = %id, error = %e, "Role lookup failed");
                    batch.failures.insert(id, e);
                }
            }
        }
        debug!(
            resolved = batch.roles.len(),
            failed = batch.failures.len(),
            "Fan-out load complete"
        );
        batch
    }
}

#[async_trait]
impl RolesProvider for DirectoryRolesProvider {
    #[instrument(skip(self, identity), fields(user_id = %identity.id()))]
    async fn load_roles(&self, identity: &ExternalIdentity) -> RoleResult<Vec<Role>> {
        let user_id = identity.id();
        debug!("Loading roles");

        if !self.config.group_search_enabled() {
            return Ok(Vec::new());
        }

        let Some(full_dn) = self.user_full_dn(user_id).await? else {
            debug!("No user DN, likely a service identity");
            return Ok(Vec::new());
        };

        let params = [full_dn, user_id.to_string()];
        debug!(
            group_search_base = %self.config.group_search_base,
            group_search_filter = %self.config.group_search_filter,
            params = %params.join(" :: "),
            group_role_attribute = %self.config.group_role_attribute,
            "Searching for groups"
        );

        let memberships = self
            .backend
            .search_for_single_attribute_values(
                &self.config.group_search_base,
                &self.config.group_search_filter,
                &params,
                &self.config.group_role_attribute,
            )
            .await?;

        let roles = roles_from_memberships(memberships, RoleSource::Directory);
        debug!(roles = ?roles.iter().map(Role::name).collect::<Vec<_>>(), "Got roles");
        Ok(roles)
    }

    #[instrument(skip(self, identities), fields(identities = identities.len()))]
    async fn multi_load_roles(&self, identities: &[ExternalIdentity]) -> RoleResult<BatchRoles> {
        if !self.config.group_search_enabled() {
            return Ok(BatchRoles::new(None));
        }

        let mut seen = HashSet::new();
        let unique: Vec<&ExternalIdentity> = identities
            .iter()
            .filter(|identity| seen.insert(identity.id()))
            .collect();

        let strategy = self.strategy_for(unique.len());
        debug!(strategy = %strategy, unique = unique.len(), "Loading roles for batch");

        match strategy {
            LoadStrategy::Bulk => {
                let ids: Vec<&str> = unique.iter().map(|identity| identity.id()).collect();
                self.bulk_load(&ids).await
            }
            LoadStrategy::FanOut => Ok(self.fan_out_load(&unique).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryEntry;
    use crate::memory::MemoryDirectory;

    fn base_config() -> DirectoryConfig {
        DirectoryConfig {
            url: "ldap://ldap.example.com:389/dc=example,dc=com".to_string(),
            group_search_base: "ou=groups".to_string(),
            group_user_attribute: "uniqueMember".to_string(),
            ..Default::default()
        }
    }

    fn group(name: &str, members: &[&str]) -> DirectoryEntry {
        DirectoryEntry::new(format!("cn={},ou=groups", name))
            .with_attribute("cn", [name])
            .with_attribute(
                "uniqueMember",
                members
                    .iter()
                    .map(|uid| format!("uid={},ou=users,dc=example,dc=com", uid)),
            )
    }

    fn build_provider(config: DirectoryConfig, directory: MemoryDirectory) -> (DirectoryRolesProvider, Arc<MemoryDirectory>) {
        let directory = Arc::new(directory);
        (DirectoryRolesProvider::new(config, directory.clone()), directory)
    }

    fn names(roles: &[Role]) -> Vec<&str> {
        roles.iter().map(Role::name).collect()
    }

    #[tokio::test]
    async fn test_user_full_dn_from_pattern() {
        let (provider, directory) = build_provider(base_config(), MemoryDirectory::new());
        let dn = provider.user_full_dn("alice").await.unwrap();
        assert_eq!(dn, Some("uid=alice,ou=users,dc=example,dc=com".to_string()));
        assert_eq!(directory.stats().total(), 0);
    }

    #[tokio::test]
    async fn test_user_full_dn_escapes_id() {
        let (provider, _) = build_provider(base_config(), MemoryDirectory::new());
        let dn = provider.user_full_dn("smith, john").await.unwrap();
        assert_eq!(
            dn,
            Some("uid=smith\\, john,ou=users,dc=example,dc=com".to_string())
        );
    }

    #[tokio::test]
    async fn test_user_full_dn_from_search() {
        let config = DirectoryConfig {
            user_search_base: "ou=people".to_string(),
            user_search_filter: "(uid={0})".to_string(),
            ..base_config()
        };
        let directory = MemoryDirectory::new()
            .with_entry(DirectoryEntry::new("uid=alice,ou=eng,ou=people").with_attribute("uid", ["alice"]));
        let (provider, directory) = build_provider(config, directory);

        let dn = provider.user_full_dn("alice").await.unwrap();
        assert_eq!(dn, Some("uid=alice,ou=eng,ou=people,dc=example,dc=com".to_string()));

        let missing = provider.user_full_dn("deploy-bot").await.unwrap();
        assert_eq!(missing, None);
        assert_eq!(directory.stats().single_entry_searches, 2);
    }

    #[tokio::test]
    async fn test_user_full_dn_malformed_pattern() {
        let config = DirectoryConfig {
            user_dn_pattern: "{0}".to_string(),
            ..base_config()
        };
        let (provider, _) = build_provider(config, MemoryDirectory::new());
        assert_eq!(provider.user_full_dn("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_roles_tags_directory_source() {
        let directory = MemoryDirectory::new()
            .with_entry(group("Ops", &["alice"]))
            .with_entry(group("release", &["alice", "bob"]));
        let (provider, _) = build_provider(base_config(), directory);

        let roles = provider.load_roles(&ExternalIdentity::new("alice")).await.unwrap();
        assert_eq!(names(&roles), vec!["ops", "release"]);
        assert!(roles.iter().all(|role| role.source() == RoleSource::Directory));
    }

    #[tokio::test]
    async fn test_load_roles_disabled() {
        let config = DirectoryConfig {
            group_search_base: String::new(),
            ..base_config()
        };
        let (provider, directory) = build_provider(config, MemoryDirectory::new().offline());

        let roles = provider.load_roles(&ExternalIdentity::new("alice")).await.unwrap();
        assert!(roles.is_empty());
        assert_eq!(directory.stats().total(), 0);
    }

    #[tokio::test]
    async fn test_load_roles_propagates_backend_failure() {
        let (provider, _) = build_provider(base_config(), MemoryDirectory::new().offline());
        let err = provider.load_roles(&ExternalIdentity::new("alice")).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_multi_load_deduplicates_identities() {
        let directory = MemoryDirectory::new().with_entry(group("ops", &["alice"]));
        let (provider, directory) = build_provider(base_config(), directory);

        let identities = vec![ExternalIdentity::new("alice"), ExternalIdentity::new("alice")];
        let batch = provider.multi_load_roles(&identities).await.unwrap();

        assert_eq!(batch.strategy, Some(LoadStrategy::FanOut));
        assert_eq!(names(batch.roles_for("alice")), vec!["ops"]);
        assert_eq!(directory.stats().attribute_searches, 1);
    }

    #[tokio::test]
    async fn test_bulk_counts_skipped_members() {
        let config = DirectoryConfig {
            bulk_threshold: 0,
            ..base_config()
        };
        let directory = MemoryDirectory::new().with_entry(
            group("ops", &["alice"]).with_attribute("uniqueMember", ["cn=printer,ou=devices"]),
        );
        let (provider, _) = build_provider(config, directory);

        let batch = provider
            .multi_load_roles(&[ExternalIdentity::new("alice")])
            .await
            .unwrap();
        assert_eq!(batch.strategy, Some(LoadStrategy::Bulk));
        assert_eq!(batch.skipped_members, 1);
        assert_eq!(names(batch.roles_for("alice")), vec!["ops"]);
    }

    #[tokio::test]
    async fn test_try_new_rejects_invalid_config() {
        let config = DirectoryConfig {
            fan_out_concurrency: 0,
            ..base_config()
        };
        let result = DirectoryRolesProvider::try_new(config, Arc::new(MemoryDirectory::new()));
        assert!(matches!(result, Err(RoleError::InvalidConfig(_))));
    }
}
