pub mod models;
mod role_memberships_schema;
mod role_memberships_store;

pub use role_memberships_schema::{
    role_memberships_table_schema, MEMBERSHIPS_BY_ROLE_INDEX, MEMBERSHIPS_BY_USER_INDEX,
};
pub use role_memberships_store::RoleMembershipsStore;
