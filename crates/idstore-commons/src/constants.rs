//! Well-known names shared by the schema declarations and the configuration defaults.

/// Default name of the table holding user records.
pub const DEFAULT_USERS_TABLE: &str = "users";

/// Default name of the table holding role records.
pub const DEFAULT_ROLES_TABLE: &str = "roles";

/// Default name of the table holding role-membership edges.
pub const DEFAULT_ROLE_USERS_TABLE: &str = "roleUsers";

/// Primary key attribute shared by every identity table.
pub const ID_ATTRIBUTE: &str = "Id";

/// Optimistic-concurrency attribute written on every save.
pub const VERSION_ATTRIBUTE: &str = "VersionNumber";

/// Soft-delete attribute used as range key of the live-record indexes.
pub const DELETED_ON_ATTRIBUTE: &str = "DeletedOn";
