use thiserror::Error;

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors reported by a [`TableBackend`](crate::TableBackend).
///
/// Backend implementations map their native failures onto these variants so
/// callers can react to the few cases that matter (missing table, lost race,
/// failed condition) without knowing the service behind the trait.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("Index '{index}' already exists on table '{table}'")]
    IndexAlreadyExists { table: String, index: String },

    #[error("Conditional check failed on table '{table}': {condition}")]
    ConditionalCheckFailed { table: String, condition: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Table error: {0}")]
    Other(String),
}

impl TableError {
    pub fn is_conditional_check_failed(&self) -> bool {
        matches!(self, TableError::ConditionalCheckFailed { .. })
    }
}

impl From<serde_json::Error> for TableError {
    fn from(err: serde_json::Error) -> Self {
        TableError::Serialization(err.to_string())
    }
}
