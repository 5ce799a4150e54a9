//! # idstore-identity
//!
//! User, role and role-membership stores for an authentication framework,
//! persisted in three tables through [`idstore_store`].
//!
//! ```text
//! users      Id | NormalizedUserName-DeletedOn-index, NormalizedEmail-DeletedOn-index
//! roles      Id | NormalizedName-DeletedOn-index
//! roleUsers  Id | NormalizedRoleName-UserId-index, UserId-NormalizedRoleName-index
//! ```
//!
//! Users and roles are soft-deleted: `DeletedOn` holds the zero timestamp
//! while the record is live, and every lookup is pinned to that value.
//! Memberships are hard-deleted.
//!
//! Call [`initialize_identity_tables`] once at startup, then build the
//! stores with [`IdentityStores::new`]. The capability traits in [`traits`]
//! (also collected in [`prelude`]) are what callers program against.

pub mod bootstrap;
pub mod error;
pub mod models;
pub mod providers;
pub mod traits;

/// Re-exported for [`impl_identity_user!`] and [`impl_identity_role!`].
pub use idstore_store as store;

pub use bootstrap::{
    initialize_identity_tables, initialize_identity_tables_with, provisioned_throughput,
    schema_manager, IdentityStores,
};
pub use error::{IdentityError, Result};
pub use models::Claim;
pub use providers::role_memberships::models::RoleMembership;
pub use providers::role_memberships::RoleMembershipsStore;
pub use providers::roles::models::{IdentityRole, Role};
pub use providers::roles::RolesStore;
pub use providers::users::models::{IdentityUser, User, UserEmail, UserLogin, UserPhoneNumber};
pub use providers::users::UsersStore;
pub use traits::*;

pub mod prelude {
    pub use crate::traits::{
        RoleClaimStore, RoleStore, UserClaimStore, UserEmailStore, UserLockoutStore,
        UserLoginStore, UserPasswordStore, UserPhoneNumberStore, UserRoleStore,
        UserSecurityStampStore, UserStore, UserTwoFactorStore,
    };
    pub use crate::{Claim, IdentityRole, IdentityUser, Role, User, UserLogin};
}
