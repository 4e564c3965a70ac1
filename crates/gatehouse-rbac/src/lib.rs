//! # Gatehouse RBAC
//!
//! Resource permissions and caller-scoped views for the gatehouse
//! permission service.
//!
//! ## Overview
//!
//! The gatehouse-rbac crate handles:
//! - **Authorizations**: The closed set of actions a caller may perform
//! - **Roles**: Normalized group memberships tagged with their provenance
//! - **Permissions**: Per-resource role → authorization grants
//! - **Resources**: Accounts, pipelines and service identities
//! - **Views**: What a specific caller may see and do on a resource
//!
//! ## Resolution
//!
//! ```text
//! caller roles + admin flag
//!   └─ Resource::view
//!        ├─ Account / Pipeline ─→ Permissions::resolve ─→ AuthorizedView
//!        └─ ServiceIdentity ──────────────────────────→ ServiceIdentityView
//! ```
//!
//! Admin callers receive every authorization without the grants being
//! consulted. A caller without roles receives none.
//!
//! ## Usage
//!
//! ```rust
//! use gatehouse_rbac::{Account, Authorization, Permissions, Resource, Role, Viewable};
//! use std::collections::HashSet;
//!
//! let account = Resource::from(
//!     Account::new("prod")
//!         .with_cloud_provider("aws")
//!         .with_permissions(
//!             Permissions::builder()
//!                 .grant("ops", [Authorization::Read, Authorization::Write])
//!                 .build(),
//!         ),
//! );
//!
//! let roles: HashSet<Role> = [Role::named("Ops")].into_iter().collect();
//! let view = account.view(&roles, false);
//! assert!(view.authorizations().unwrap().contains(Authorization::Write));
//! ```
//!
//! ## Integration with gatehouse-roles
//!
//! `gatehouse-roles` resolves the directory memberships of an
//! [`ExternalIdentity`]; [`ExternalIdentity::role_set`] then feeds
//! [`Viewable::view`].

pub mod authorization;
pub mod identity;
pub mod permissions;
pub mod resources;
pub mod role;
pub mod view;

// Re-export main types for convenience
pub use authorization::{Authorization, AuthorizationSet};
pub use identity::ExternalIdentity;
pub use permissions::{Permissions, PermissionsBuilder};
pub use resources::{Account, Pipeline, Resource, ResourceType, ServiceIdentity, Viewable};
pub use role::{Role, RoleSource};
pub use view::{AuthorizedView, ServiceIdentityView, View};
