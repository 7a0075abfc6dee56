use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] shelf_core::Error),
    #[error(transparent)]
    LibSql(#[from] libsql::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Book ID cannot be empty")]
    EmptyBookId,
    #[error("Book not found for id/prefix: {0}")]
    BookNotFound(String),
    #[error("{0}")]
    AmbiguousBookId(String),
    #[error("Import file is not a JSON array of records: {0}")]
    InvalidImportFile(String),
    #[error(
        "Sync is not configured. Run `shelf config set-remote --token ... --repository owner/name` first."
    )]
    SyncNotConfigured,
}
