//! # idstore-commons
//!
//! Shared types used across the idstore crates.
//!
//! ## Type-Safe Wrappers
//!
//! - `UserId`: identifier of a user record
//! - `RoleId`: identifier of a role record
//! - `MembershipId`: identifier of a role-membership edge
//!
//! ## Key Normalization
//!
//! Every lookup key (user name, email, role name) is stored in normalized form
//! next to the display value. [`normalize_key`] is the single place that
//! decides what "normalized" means.
//!
//! ## Soft-Delete Timestamps
//!
//! Records are never physically removed. The `DeletedOn` attribute holds the
//! zero timestamp while a record is live, which keeps it addressable as the
//! range key of the `*-DeletedOn-index` secondary indexes. See [`timestamp`].
//!
//! ```rust
//! use idstore_commons::{normalize_key, UserId};
//!
//! let id = UserId::generate();
//! assert_eq!(normalize_key("alice@example.com"), "ALICE@EXAMPLE.COM");
//! assert!(!id.as_str().is_empty());
//! ```

pub mod constants;
pub mod models;
pub mod normalize;
pub mod timestamp;

pub use constants::{DEFAULT_ROLES_TABLE, DEFAULT_ROLE_USERS_TABLE, DEFAULT_USERS_TABLE};
pub use models::{MembershipId, RoleId, UserId};
pub use normalize::normalize_key;
pub use timestamp::{deleted_on_key, format_timestamp, zero_timestamp, ZERO_TIMESTAMP};
