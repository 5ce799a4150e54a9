pub mod models;
mod users_schema;
mod users_store;

pub use users_schema::{
    create_users_indexes, users_table_schema, USERS_BY_EMAIL_INDEX, USERS_BY_NAME_INDEX,
};
pub use users_store::UsersStore;
