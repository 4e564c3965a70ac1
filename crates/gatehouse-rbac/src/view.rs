//! Caller-scoped views of resources.
//!
//! Views are built on demand, handed to the caller and discarded. They own
//! copies of the fields they expose and never borrow the resource's grants.

use serde::{Deserialize, Serialize};

use crate::authorization::AuthorizationSet;
use crate::resources::ResourceType;

/// View of a grant-gated resource (accounts, pipelines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedView {
    /// Type of the viewed resource.
    pub resource_type: ResourceType,
    /// Resource name.
    pub name: String,
    /// Authorizations the caller may exercise.
    pub authorizations: AuthorizationSet,
}

/// View of a service identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentityView {
    /// Identity name.
    pub name: String,
    /// Normalized group memberships.
    pub member_of: Vec<String>,
}

/// View of any [`Resource`](crate::Resource).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum View {
    /// Grant-gated resource view.
    Authorized(AuthorizedView),
    /// Service identity view.
    ServiceIdentity(ServiceIdentityView),
}

impl View {
    /// Name of the viewed resource.
    pub fn name(&self) -> &str {
        match self {
            View::Authorized(view) => &view.name,
            View::ServiceIdentity(view) => &view.name,
        }
    }

    /// Resolved authorizations, for grant-gated resources.
    pub fn authorizations(&self) -> Option<&AuthorizationSet> {
        match self {
            View::Authorized(view) => Some(&view.authorizations),
            View::ServiceIdentity(_) => None,
        }
    }

    /// Memberships, for service identities.
    pub fn member_of(&self) -> Option<&[String]> {
        match self {
            View::Authorized(_) => None,
            View::ServiceIdentity(view) => Some(&view.member_of),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::Authorization;

    #[test]
    fn test_authorized_view_json() {
        let view = View::Authorized(AuthorizedView {
            resource_type: ResourceType::Pipeline,
            name: "deploy".to_string(),
            authorizations: AuthorizationSet::from_iter([Authorization::Execute]),
        });

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "resource_type": "pipeline",
                "name": "deploy",
                "authorizations": ["EXECUTE"]
            })
        );
    }

    #[test]
    fn test_service_identity_view_json() {
        let view = View::ServiceIdentity(ServiceIdentityView {
            name: "bot".to_string(),
            member_of: vec!["ops".to_string()],
        });

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json, serde_json::json!({"name": "bot", "member_of": ["ops"]}));
    }
}
