use std::path::Path;

use shelf_core::db::{BookRepository, LibSqlBookRepository};
use shelf_core::import::normalize_rows;

use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_import(input: &Path, db_path: &Path) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(input)?;
    let rows: Vec<serde_json::Value> = serde_json::from_str(&raw)
        .map_err(|error| CliError::InvalidImportFile(error.to_string()))?;

    let batch = normalize_rows(&rows);
    let unmapped = batch.errors;

    let db = open_database(db_path).await?;
    let repo = LibSqlBookRepository::new(db.connection());
    let summary = repo.bulk_upsert(batch.books).await?;

    println!(
        "Imported: {} added, {} updated, {} skipped",
        summary.added,
        summary.updated,
        summary.errors + unmapped
    );
    Ok(())
}
