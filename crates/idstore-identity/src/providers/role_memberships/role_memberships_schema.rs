//! Role-membership table declaration.
//!
//! The same two attributes are indexed in both orders:
//!
//! 1. **NormalizedRoleName-UserId-index** - "Users in role R", "is U in R"
//! 2. **UserId-NormalizedRoleName-index** - "Roles of user U"

use idstore_commons::constants::ID_ATTRIBUTE;
use idstore_store::{KeyAttribute, KeySchema, ProvisionedThroughput, SecondaryIndex, TableSchema};

pub const MEMBERSHIPS_BY_ROLE_INDEX: &str = "NormalizedRoleName-UserId-index";
pub const MEMBERSHIPS_BY_USER_INDEX: &str = "UserId-NormalizedRoleName-index";

pub(crate) const ROLE_ATTRIBUTE: &str = "NormalizedRoleName";
pub(crate) const USER_ATTRIBUTE: &str = "UserId";

pub fn role_memberships_table_schema(
    table_name: &str,
    throughput: ProvisionedThroughput,
) -> TableSchema {
    TableSchema::new(table_name, KeySchema::hash(KeyAttribute::string(ID_ATTRIBUTE)))
        .with_index(SecondaryIndex::new(
            MEMBERSHIPS_BY_ROLE_INDEX,
            KeySchema::hash_and_range(
                KeyAttribute::string(ROLE_ATTRIBUTE),
                KeyAttribute::string(USER_ATTRIBUTE),
            ),
        ))
        .with_index(SecondaryIndex::new(
            MEMBERSHIPS_BY_USER_INDEX,
            KeySchema::hash_and_range(
                KeyAttribute::string(USER_ATTRIBUTE),
                KeyAttribute::string(ROLE_ATTRIBUTE),
            ),
        ))
        .with_throughput(throughput)
}
