//! # Gatehouse Roles
//!
//! Resolves the external roles of identities from directory group
//! memberships.
//!
//! ## Overview
//!
//! The gatehouse-roles crate handles:
//! - **Configuration**: Directory URL, search bases, filters and thresholds
//! - **Directory Backends**: The search capabilities role resolution needs
//! - **Single Lookups**: User DN resolution followed by a group search
//! - **Batch Lookups**: Bulk group scans or bounded per-identity fan-out
//!
//! ## Features
//!
//! - `MemoryDirectory`: In-memory backend with call counters and failure
//!   injection, for tests and local development
//!
//! ## Batch Strategies
//!
//! | Identities                 | Strategy | Directory calls           |
//! |----------------------------|----------|---------------------------|
//! | `<= bulk_threshold`        | Fan-out  | one or two per identity   |
//! | `>  bulk_threshold`        | Bulk     | one scan over all groups  |
//!
//! Bulk requires `group_user_attribute` to be configured; without it every
//! batch fans out.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gatehouse_rbac::ExternalIdentity;
//! use gatehouse_roles::{DirectoryConfig, DirectoryRolesProvider, MemoryDirectory, RolesProvider};
//! use std::sync::Arc;
//!
//! async fn resolve_example() {
//!     let provider = DirectoryRolesProvider::try_new(
//!         DirectoryConfig::from_env(),
//!         Arc::new(MemoryDirectory::new()),
//!     )
//!     .unwrap();
//!
//!     let mut identities = vec![ExternalIdentity::new("alice"), ExternalIdentity::new("bob")];
//!     let batch = provider.resolve_identities(&mut identities).await.unwrap();
//!
//!     for failed in batch.failures.keys() {
//!         println!("could not resolve {}", failed);
//!     }
//! }
//! ```
//!
//! ## Environment Variables
//!
//! See [`DirectoryConfig::from_env`] for the `DIRECTORY_*` variables read.

pub mod config;
pub mod directory;
pub mod error;
pub mod memory;
pub mod merge;
pub mod pattern;
pub mod provider;
pub mod strategy;

// Re-export main types for convenience
pub use config::{ConfigError, DirectoryConfig};
pub use directory::{DirectoryBackend, DirectoryEntry};
pub use error::{DirectoryError, DirectoryResult, RoleError, RoleResult};
pub use memory::{DirectoryStats, MemoryDirectory};
pub use merge::GroupMemberMapper;
pub use pattern::Pattern;
pub use provider::{BatchRoles, DirectoryRolesProvider, RolesProvider};
pub use strategy::LoadStrategy;
