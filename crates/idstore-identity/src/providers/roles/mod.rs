pub mod models;
mod roles_schema;
mod roles_store;

pub use roles_schema::{roles_table_schema, ROLES_BY_NAME_INDEX};
pub use roles_store::RolesStore;
