//! # Resources
//!
//! Protected resource variants and the closed [`Resource`] type over them.
//!
//! A resource is identified by its type and name; any other stored
//! attribute (an account's cloud provider, its grants) does not take part
//! in equality or hashing.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::identity::ExternalIdentity;
use crate::permissions::Permissions;
use crate::role::{normalize_role_name, Role, RoleSource};
use crate::view::{AuthorizedView, ServiceIdentityView, View};

/// Kinds of protected resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Deployment target account.
    Account,
    /// Delivery pipeline.
    Pipeline,
    /// Non-human principal acting on behalf of its member groups.
    ServiceIdentity,
}

impl ResourceType {
    /// Get the string representation of the resource type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Account => "account",
            ResourceType::Pipeline => "pipeline",
            ResourceType::ServiceIdentity => "service_identity",
        }
    }

    /// Parse resource type from string representation.
    ///
    /// # Example
    ///
    /// ```
    /// use gatehouse_rbac::ResourceType;
    ///
    /// assert_eq!(ResourceType::parse("account"), Some(ResourceType::Account));
    /// assert_eq!(ResourceType::parse("service_account"), Some(ResourceType::ServiceIdentity));
    /// assert_eq!(ResourceType::parse("bucket"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "account" | "accounts" => Some(ResourceType::Account),
            "pipeline" | "pipelines" => Some(ResourceType::Pipeline),
            "service_identity" | "service_account" | "service_accounts" => {
                Some(ResourceType::ServiceIdentity)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces a caller-scoped view of a resource.
pub trait Viewable {
    /// The projection handed back to callers.
    type View;

    /// Build the view for a caller holding `caller_roles`.
    ///
    /// Never fails; a caller without grants gets a view with no
    /// authorizations.
    fn view(&self, caller_roles: &HashSet<Role>, is_admin: bool) -> Self::View;
}

/// A deployment target account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account name.
    pub name: String,

    /// Cloud provider hosting the account (e.g. "aws", "kubernetes").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,

    /// Role grants on this account.
    #[serde(default)]
    pub permissions: Permissions,
}

impl Account {
    /// Creates an account with no grants.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cloud_provider: None,
            permissions: Permissions::empty(),
        }
    }

    /// Set the cloud provider.
    pub fn with_cloud_provider(mut self, cloud_provider: impl Into<String>) -> Self {
        self.cloud_provider = Some(cloud_provider.into());
        self
    }

    /// Set the role grants.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

impl Viewable for Account {
    type View = AuthorizedView;

    fn view(&self, caller_roles: &HashSet<Role>, is_admin: bool) -> AuthorizedView {
        AuthorizedView {
            resource_type: ResourceType::Account,
            name: self.name.clone(),
            authorizations: self.permissions.resolve(caller_roles, is_admin),
        }
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ResourceType::Account.hash(state);
        self.name.hash(state);
    }
}

/// A delivery pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline name.
    pub name: String,

    /// Role grants on this pipeline.
    #[serde(default)]
    pub permissions: Permissions,
}

impl Pipeline {
    /// Creates a pipeline with no grants.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Permissions::empty(),
        }
    }

    /// Set the role grants.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

impl Viewable for Pipeline {
    type View = AuthorizedView;

    fn view(&self, caller_roles: &HashSet<Role>, is_admin: bool) -> AuthorizedView {
        AuthorizedView {
            resource_type: ResourceType::Pipeline,
            name: self.name.clone(),
            authorizations: self.permissions.resolve(caller_roles, is_admin),
        }
    }
}

impl PartialEq for Pipeline {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Pipeline {}

impl Hash for Pipeline {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ResourceType::Pipeline.hash(state);
        self.name.hash(state);
    }
}

/// A non-human principal and the groups it is a member of.
///
/// Service identities are not gated by grants: any authenticated caller
/// sees the same view. Memberships are kept normalized (trimmed,
/// lower-cased, blank entries dropped, deduplicated in first-seen order).
///
/// # Examples
///
/// ```
/// use gatehouse_rbac::ServiceIdentity;
///
/// let identity = ServiceIdentity::new("deploy-bot")
///     .with_member_of([" Ops ", "ops", "OPS", ""]);
///
/// assert_eq!(identity.member_of(), ["ops"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceIdentity {
    /// Identity name.
    pub name: String,

    #[serde(default, deserialize_with = "deserialize_memberships")]
    member_of: Vec<String>,
}

impl ServiceIdentity {
    /// Creates a service identity with no memberships.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            member_of: Vec::new(),
        }
    }

    /// Replace the memberships, normalizing them.
    pub fn with_member_of<I, S>(mut self, memberships: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_member_of(memberships);
        self
    }

    /// Replace the memberships, normalizing them.
    pub fn set_member_of<I, S>(&mut self, memberships: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.member_of = normalize_memberships(memberships);
    }

    /// Normalized group memberships.
    pub fn member_of(&self) -> &[String] {
        &self.member_of
    }

    /// Convert into an identity carrying one externally sourced role per
    /// membership.
    pub fn to_external_identity(&self) -> ExternalIdentity {
        let roles = self
            .member_of
            .iter()
            .map(|membership| Role::new(membership, RoleSource::External));
        ExternalIdentity::new(self.name.clone()).with_roles(roles)
    }
}

impl Viewable for ServiceIdentity {
    type View = ServiceIdentityView;

    fn view(&self, _caller_roles: &HashSet<Role>, _is_admin: bool) -> ServiceIdentityView {
        ServiceIdentityView {
            name: self.name.clone(),
            member_of: self.member_of.clone(),
        }
    }
}

impl PartialEq for ServiceIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ServiceIdentity {}

impl Hash for ServiceIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ResourceType::ServiceIdentity.hash(state);
        self.name.hash(state);
    }
}

/// Normalize raw membership strings.
///
/// Trims and lower-cases every entry, drops entries left blank, and
/// removes duplicates keeping the first occurrence.
///
/// # Examples
///
/// ```
/// use gatehouse_rbac::resources::normalize_memberships;
///
/// let normalized = normalize_memberships(["Deployers", " ops ", "deployers"]);
/// assert_eq!(normalized, vec!["deployers".to_string(), "ops".to_string()]);
/// ```
pub fn normalize_memberships<I, S>(memberships: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    memberships
        .into_iter()
        .filter_map(|raw| normalize_role_name(raw.as_ref()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

fn deserialize_memberships<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(normalize_memberships(raw.unwrap_or_default()))
}

/// Any protected resource.
///
/// Identity is the `(type, name)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "resource_type", rename_all = "snake_case")]
pub enum Resource {
    /// Deployment target account.
    Account(Account),
    /// Delivery pipeline.
    Pipeline(Pipeline),
    /// Service identity.
    ServiceIdentity(ServiceIdentity),
}

impl Resource {
    /// Type tag of this resource.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::Account(_) => ResourceType::Account,
            Resource::Pipeline(_) => ResourceType::Pipeline,
            Resource::ServiceIdentity(_) => ResourceType::ServiceIdentity,
        }
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        match self {
            Resource::Account(account) => &account.name,
            Resource::Pipeline(pipeline) => &pipeline.name,
            Resource::ServiceIdentity(identity) => &identity.name,
        }
    }

    /// Grants gating this resource, if the variant is gated at all.
    pub fn permissions(&self) -> Option<&Permissions> {
        match self {
            Resource::Account(account) => Some(&account.permissions),
            Resource::Pipeline(pipeline) => Some(&pipeline.permissions),
            Resource::ServiceIdentity(_) => None,
        }
    }
}

impl Viewable for Resource {
    type View = View;

    fn view(&self, caller_roles: &HashSet<Role>, is_admin: bool) -> View {
        match self {
            Resource::Account(account) => View::Authorized(account.view(caller_roles, is_admin)),
            Resource::Pipeline(pipeline) => {
                View::Authorized(pipeline.view(caller_roles, is_admin))
            }
            Resource::ServiceIdentity(identity) => {
                View::ServiceIdentity(identity.view(caller_roles, is_admin))
            }
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.resource_type() == other.resource_type() && self.name() == other.name()
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource_type().hash(state);
        self.name().hash(state);
    }
}

impl From<Account> for Resource {
    fn from(account: Account) -> Self {
        Resource::Account(account)
    }
}

impl From<Pipeline> for Resource {
    fn from(pipeline: Pipeline) -> Self {
        Resource::Pipeline(pipeline)
    }
}

impl From<ServiceIdentity> for Resource {
    fn from(identity: ServiceIdentity) -> Self {
        Resource::ServiceIdentity(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::{Authorization, AuthorizationSet};
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn roles(names: &[&str]) -> HashSet<Role> {
        names.iter().map(|name| Role::named(name)).collect()
    }

    fn ops_permissions() -> Permissions {
        Permissions::builder()
            .grant("ops", [Authorization::Read, Authorization::Write])
            .grant("admin", Authorization::ALL)
            .build()
    }

    #[test]
    fn test_account_identity_ignores_cloud_provider() {
        let aws = Account::new("prod").with_cloud_provider("aws");
        let gce = Account::new("prod")
            .with_cloud_provider("gce")
            .with_permissions(ops_permissions());

        assert_eq!(aws, gce);
        assert_eq!(hash_of(&aws), hash_of(&gce));
        assert_ne!(aws, Account::new("staging").with_cloud_provider("aws"));
    }

    #[test]
    fn test_resource_identity_includes_type() {
        let account = Resource::from(Account::new("shared"));
        let pipeline = Resource::from(Pipeline::new("shared"));
        assert_ne!(account, pipeline);

        let set: HashSet<Resource> = [
            account.clone(),
            Resource::from(Account::new("shared").with_cloud_provider("aws")),
            pipeline,
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_account_view() {
        let account = Account::new("prod").with_permissions(ops_permissions());

        let view = account.view(&roles(&["ops"]), false);
        assert_eq!(view.name, "prod");
        assert_eq!(view.resource_type, ResourceType::Account);
        assert_eq!(
            view.authorizations,
            AuthorizationSet::from_iter([Authorization::Read, Authorization::Write])
        );

        assert!(account.view(&roles(&["guest"]), false).authorizations.is_empty());
        assert!(account.view(&HashSet::new(), true).authorizations.is_all());
    }

    #[test]
    fn test_pipeline_view() {
        let pipeline = Pipeline::new("deploy-prod").with_permissions(
            Permissions::builder()
                .grant("release", [Authorization::Execute, Authorization::Read])
                .build(),
        );

        let view = pipeline.view(&roles(&["Release"]), false);
        assert_eq!(view.resource_type, ResourceType::Pipeline);
        assert!(view.authorizations.contains(Authorization::Execute));
        assert!(!view.authorizations.contains(Authorization::Write));
    }

    #[test]
    fn test_service_identity_view_is_ungated() {
        let identity = ServiceIdentity::new("deploy-bot").with_member_of(["Ops", "release"]);

        let anonymous = identity.view(&HashSet::new(), false);
        let admin = identity.view(&roles(&["admin"]), true);
        assert_eq!(anonymous, admin);
        assert_eq!(anonymous.member_of, vec!["ops", "release"]);
    }

    #[test]
    fn test_member_of_normalization() {
        let identity = ServiceIdentity::new("bot").with_member_of([" Ops ", "ops", "OPS", ""]);
        assert_eq!(identity.member_of(), ["ops"]);
    }

    #[test]
    fn test_set_member_of_replaces() {
        let mut identity = ServiceIdentity::new("bot").with_member_of(["a", "b"]);
        identity.set_member_of(["c"]);
        assert_eq!(identity.member_of(), ["c"]);
    }

    #[test]
    fn test_to_external_identity() {
        let identity = ServiceIdentity::new("deploy-bot").with_member_of(["Ops", " release "]);
        let external = identity.to_external_identity();

        assert_eq!(external.id(), "deploy-bot");
        assert_eq!(external.roles().len(), 2);
        assert!(external
            .roles()
            .iter()
            .all(|role| role.source() == RoleSource::External));
    }

    #[test]
    fn test_resource_view_dispatch() {
        let account = Resource::from(Account::new("prod").with_permissions(ops_permissions()));
        let view = account.view(&roles(&["ops"]), false);
        assert_eq!(view.name(), "prod");
        assert_eq!(view.authorizations().map(AuthorizationSet::len), Some(2));

        let identity = Resource::from(ServiceIdentity::new("bot").with_member_of(["ops"]));
        let view = identity.view(&HashSet::new(), false);
        assert!(view.authorizations().is_none());
        assert_eq!(view.member_of(), Some(&["ops".to_string()][..]));
    }

    #[test]
    fn test_resource_view_is_repeatable() {
        let resources = [
            Resource::from(Account::new("prod").with_permissions(ops_permissions())),
            Resource::from(Pipeline::new("deploy").with_permissions(ops_permissions())),
            Resource::from(ServiceIdentity::new("bot").with_member_of(["ops"])),
        ];
        let caller = roles(&["ops", "guest"]);

        for resource in &resources {
            for is_admin in [false, true] {
                assert_eq!(resource.view(&caller, is_admin), resource.view(&caller, is_admin));
            }
        }
    }

    #[test]
    fn test_resource_deserialization() {
        let json = r#"{
            "resource_type": "service_identity",
            "name": "bot",
            "member_of": [" Ops ", "ops", ""]
        }"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.resource_type(), ResourceType::ServiceIdentity);
        assert!(resource.permissions().is_none());

        match resource {
            Resource::ServiceIdentity(identity) => assert_eq!(identity.member_of(), ["ops"]),
            other => panic!("unexpected resource: {:?}", other),
        }

        let json = r#"{"resource_type": "account", "name": "prod", "cloud_provider": "aws",
                       "permissions": {"ops": ["READ"]}}"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.name(), "prod");
        assert_eq!(resource.permissions().map(Permissions::len), Some(1));
    }
}
