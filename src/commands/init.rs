use idstore_store::TableDescription;

/// One line per table with its status and indexes.
pub fn format_tables(tables: &[TableDescription]) -> String {
    tables
        .iter()
        .map(|table| {
            format!(
                "{:<16} {:<8} {}",
                table.table_name,
                table.status,
                table.index_names().join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
