use idstore_store::{SchemaError, TableError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that can occur in identity store operations
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid operation: {0}")]
    InvalidState(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] TableError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Result type for identity store operations
pub type Result<T> = std::result::Result<T, IdentityError>;

/// Fails with `Cancelled` once the token has fired. Checked before every backend call.
pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(IdentityError::Cancelled)
    } else {
        Ok(())
    }
}

/// Rejects empty required inputs.
pub(crate) fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        Err(IdentityError::InvalidArgument(format!("{} must not be empty", name)))
    } else {
        Ok(())
    }
}
