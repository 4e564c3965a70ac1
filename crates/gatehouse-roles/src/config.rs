//! Directory configuration.
//!
//! Settings consumed by the directory roles provider. Loaded from
//! environment variables or deserialized from a config file, with defaults
//! suitable for a typical LDAP layout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pattern::Pattern;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Directory and group-membership settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Directory URL; its path holds the root DN
    /// (e.g. "ldap://ldap.example.com:389/dc=example,dc=com").
    pub url: String,

    /// Base for group searches, relative to the root DN.
    ///
    /// Empty disables group lookups entirely.
    pub group_search_base: String,

    /// Group search filter; `{0}` is the user's full DN, `{1}` the raw id.
    pub group_search_filter: String,

    /// Group attribute holding the role name.
    pub group_role_attribute: String,

    /// Group attribute listing member DNs.
    ///
    /// Empty means the schema cannot be scanned group → members, which
    /// rules out bulk loading.
    pub group_user_attribute: String,

    /// Base for user searches, relative to the root DN.
    pub user_search_base: String,

    /// User search filter with the escaped id as `{0}`.
    ///
    /// When empty, `user_dn_pattern` is used instead of a search.
    pub user_search_filter: String,

    /// Pattern building a user's DN (relative to the root DN) from its id.
    pub user_dn_pattern: String,

    /// Batch size above which a single group scan replaces per-identity
    /// lookups.
    pub bulk_threshold: usize,

    /// Maximum concurrent per-identity lookups during a fan-out batch.
    pub fan_out_concurrency: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            group_search_base: String::new(),
            group_search_filter: "(uniqueMember={0})".to_string(),
            group_role_attribute: "cn".to_string(),
            group_user_attribute: String::new(),
            user_search_base: String::new(),
            user_search_filter: String::new(),
            user_dn_pattern: "uid={0},ou=users".to_string(),
            bulk_threshold: 1000,
            fan_out_concurrency: 8,
        }
    }
}

impl DirectoryConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DIRECTORY_URL`: Directory URL including root DN
    /// - `DIRECTORY_GROUP_SEARCH_BASE`: Group search base (empty disables groups)
    /// - `DIRECTORY_GROUP_SEARCH_FILTER`: Group filter (default: `(uniqueMember={0})`)
    /// - `DIRECTORY_GROUP_ROLE_ATTRIBUTE`: Role name attribute (default: `cn`)
    /// - `DIRECTORY_GROUP_USER_ATTRIBUTE`: Member attribute (default: empty)
    /// - `DIRECTORY_USER_SEARCH_BASE`: User search base
    /// - `DIRECTORY_USER_SEARCH_FILTER`: User search filter
    /// - `DIRECTORY_USER_DN_PATTERN`: User DN pattern (default: `uid={0},ou=users`)
    /// - `DIRECTORY_BULK_THRESHOLD`: Bulk load threshold (default: 1000)
    /// - `DIRECTORY_FAN_OUT_CONCURRENCY`: Concurrent fan-out lookups (default: 8)
    pub fn from_env() -> Self {
        let default = Self::default();
        let var = |key: &str, fallback: String| std::env::var(key).unwrap_or(fallback);

        Self {
            url: var("DIRECTORY_URL", default.url),
            group_search_base: var("DIRECTORY_GROUP_SEARCH_BASE", default.group_search_base),
            group_search_filter: var("DIRECTORY_GROUP_SEARCH_FILTER", default.group_search_filter),
            group_role_attribute: var(
                "DIRECTORY_GROUP_ROLE_ATTRIBUTE",
                default.group_role_attribute,
            ),
            group_user_attribute: var(
                "DIRECTORY_GROUP_USER_ATTRIBUTE",
                default.group_user_attribute,
            ),
            user_search_base: var("DIRECTORY_USER_SEARCH_BASE", default.user_search_base),
            user_search_filter: var("DIRECTORY_USER_SEARCH_FILTER", default.user_search_filter),
            user_dn_pattern: var("DIRECTORY_USER_DN_PATTERN", default.user_dn_pattern),
            bulk_threshold: std::env::var("DIRECTORY_BULK_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.bulk_threshold),
            fan_out_concurrency: std::env::var("DIRECTORY_FAN_OUT_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.fan_out_concurrency),
        }
    }

    /// Whether group lookups are enabled at all.
    pub fn group_search_enabled(&self) -> bool {
        !self.group_search_base.trim().is_empty()
    }

    /// Whether the schema allows scanning groups for their members.
    pub fn bulk_capable(&self) -> bool {
        !self.group_user_attribute.trim().is_empty()
    }

    /// Root DN taken from the path of [`DirectoryConfig::url`].
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse_roles::DirectoryConfig;
    ///
    /// let config = DirectoryConfig {
    ///     url: "ldaps://ldap.example.com:636/dc=example,dc=com".to_string(),
    ///     ..Default::default()
    /// };
    /// assert_eq!(config.root_dn(), "dc=example,dc=com");
    /// ```
    pub fn root_dn(&self) -> &str {
        let url = self.url.trim();
        let after_scheme = match url.find("://") {
            Some(index) => &url[index + 3..],
            None => return "",
        };
        let path = match after_scheme.find('/') {
            Some(index) => &after_scheme[index + 1..],
            None => return "",
        };
        path.split('?').next().unwrap_or_default().trim()
    }

    /// Validate settings the resolver relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_search_enabled() && !Pattern::new(&self.group_search_filter).has_placeholder(0)
        {
            return Err(ConfigError::InvalidValue {
                key: "group_search_filter".to_string(),
                message: "must reference the user DN as {0}".to_string(),
            });
        }
        if self.group_search_enabled() && self.group_role_attribute.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "group_role_attribute".to_string(),
                message: "must not be empty when group search is enabled".to_string(),
            });
        }
        if self.user_search_filter.trim().is_empty()
            && !Pattern::new(&self.user_dn_pattern).has_placeholder(0)
        {
            return Err(ConfigError::InvalidValue {
                key: "user_dn_pattern".to_string(),
                message: "must reference the user id as {0}".to_string(),
            });
        }
        if self.fan_out_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fan_out_concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DirectoryConfig::default();
        assert!(!config.group_search_enabled());
        assert!(!config.bulk_capable());
        assert_eq!(config.bulk_threshold, 1000);
        assert_eq!(config.group_search_filter, "(uniqueMember={0})");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_root_dn() {
        let mut config = DirectoryConfig {
            url: "ldap://ldap.example.com:389/dc=example,dc=com".to_string(),
            ..Default::default()
        };
        assert_eq!(config.root_dn(), "dc=example,dc=com");

        config.url = "ldap://ldap.example.com:389".to_string();
        assert_eq!(config.root_dn(), "");

        config.url = "ldap://ldap.example.com/o=acme?uid".to_string();
        assert_eq!(config.root_dn(), "o=acme");

        config.url = String::new();
        assert_eq!(config.root_dn(), "");
    }

    #[test]
    fn test_validate_rejects_filter_without_user_dn() {
        let config = DirectoryConfig {
            group_search_base: "ou=groups".to_string(),
            group_search_filter: "(objectClass=groupOfNames)".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "group_search_filter"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = DirectoryConfig {
            fan_out_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_allows_search_filter_without_pattern() {
        let config = DirectoryConfig {
            user_dn_pattern: String::new(),
            user_search_filter: "(uid={0})".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: DirectoryConfig = serde_json::from_str(
            r#"{"group_search_base": "ou=groups", "group_user_attribute": "member", "bulk_threshold": 100}"#,
        )
        .unwrap();

        assert!(config.group_search_enabled());
        assert!(config.bulk_capable());
        assert_eq!(config.bulk_threshold, 100);
        assert_eq!(config.group_role_attribute, "cn");
    }
}
