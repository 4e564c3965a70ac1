//! Directory backend abstraction.
//!
//! The resolver needs three capabilities from a directory: find a single
//! entry, read one attribute across matching entries, and list matching
//! entries with their attributes. Connection handling, filter encoding and
//! timeouts belong to the implementation.
//!
//! DNs and search bases exchanged through this trait are relative to the
//! directory root DN, as with an LDAP context bound at that root.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::DirectoryResult;

/// Directory backend trait.
///
/// `filter` arguments may contain `{N}` placeholders; implementations
/// substitute `params[N]`, escaping each value for the filter syntax.
#[async_trait]
pub trait DirectoryBackend: Send + Sync {
    /// Search for exactly one entry.
    ///
    /// # Returns
    ///
    /// The entry's DN, or `None` if zero or several entries match
    async fn search_for_single_entry(
        &self,
        base: &str,
        filter: &str,
        params: &[String],
    ) -> DirectoryResult<Option<String>>;

    /// Collect the values of `attribute` across all matching entries.
    ///
    /// Values are returned in the order the directory produced them.
    async fn search_for_single_attribute_values(
        &self,
        base: &str,
        filter: &str,
        params: &[String],
        attribute: &str,
    ) -> DirectoryResult<Vec<String>>;

    /// List all entries matching an already formatted filter.
    ///
    /// Callers map the returned entries themselves.
    async fn search_entries(&self, base: &str, filter: &str) -> DirectoryResult<Vec<DirectoryEntry>>;
}

/// A directory entry with its attributes.
///
/// Attribute names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// DN relative to the root DN.
    pub dn: String,
    attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Create an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add values to an attribute.
    pub fn with_attribute<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .entry(name.to_ascii_lowercase())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// All values of an attribute.
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First value of an attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_are_case_insensitive() {
        let entry = DirectoryEntry::new("cn=ops,ou=groups")
            .with_attribute("cn", ["ops"])
            .with_attribute("uniqueMember", ["uid=a,ou=users"])
            .with_attribute("UNIQUEMEMBER", ["uid=b,ou=users"]);

        assert_eq!(entry.first("CN"), Some("ops"));
        assert_eq!(entry.values("uniquemember").len(), 2);
        assert!(entry.values("member").is_empty());
        assert_eq!(entry.first("member"), None);
    }
}
