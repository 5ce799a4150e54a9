use idstore_commons::constants::{DELETED_ON_ATTRIBUTE, ID_ATTRIBUTE};
use idstore_store::{KeyAttribute, KeySchema, ProvisionedThroughput, SecondaryIndex, TableSchema};

/// Live roles by normalized name.
pub const ROLES_BY_NAME_INDEX: &str = "NormalizedName-DeletedOn-index";

pub fn roles_table_schema(table_name: &str, throughput: ProvisionedThroughput) -> TableSchema {
    TableSchema::new(table_name, KeySchema::hash(KeyAttribute::string(ID_ATTRIBUTE)))
        .with_index(SecondaryIndex::new(
            ROLES_BY_NAME_INDEX,
            KeySchema::hash_and_range(
                KeyAttribute::string("NormalizedName"),
                KeyAttribute::string(DELETED_ON_ATTRIBUTE),
            ),
        ))
        .with_throughput(throughput)
}
