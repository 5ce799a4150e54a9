//! Users table declaration.
//!
//! Two indexes, both with `DeletedOn` as range key so a lookup pinned to the
//! zero timestamp only sees live users:
//!
//! 1. **NormalizedUserName-DeletedOn-index** - "Get user by user name"
//! 2. **NormalizedEmail-DeletedOn-index** - "Get user by email" (sparse: users
//!    without an email are not in it)

use idstore_commons::constants::{DELETED_ON_ATTRIBUTE, ID_ATTRIBUTE};
use idstore_store::{KeyAttribute, KeySchema, ProvisionedThroughput, SecondaryIndex, TableSchema};

pub const USERS_BY_NAME_INDEX: &str = "NormalizedUserName-DeletedOn-index";
pub const USERS_BY_EMAIL_INDEX: &str = "NormalizedEmail-DeletedOn-index";

pub fn create_users_indexes() -> Vec<SecondaryIndex> {
    vec![
        SecondaryIndex::new(
            USERS_BY_NAME_INDEX,
            KeySchema::hash_and_range(
                KeyAttribute::string("NormalizedUserName"),
                KeyAttribute::string(DELETED_ON_ATTRIBUTE),
            ),
        ),
        SecondaryIndex::new(
            USERS_BY_EMAIL_INDEX,
            KeySchema::hash_and_range(
                KeyAttribute::string("NormalizedEmail"),
                KeyAttribute::string(DELETED_ON_ATTRIBUTE),
            ),
        ),
    ]
}

pub fn users_table_schema(table_name: &str, throughput: ProvisionedThroughput) -> TableSchema {
    let schema = TableSchema::new(table_name, KeySchema::hash(KeyAttribute::string(ID_ATTRIBUTE)));
    create_users_indexes()
        .into_iter()
        .fold(schema, TableSchema::with_index)
        .with_throughput(throughput)
}
