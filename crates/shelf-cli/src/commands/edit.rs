use std::path::Path;

use shelf_core::db::{BookRepository, LibSqlBookRepository};

use crate::cli::BookFields;
use crate::commands::common::{merge_fields, open_database, resolve_book};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<String>,
    author: Option<String>,
    fields: BookFields,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let book = resolve_book(id, &db).await?;

    let draft = merge_fields(book.to_draft(), title, author, fields);

    let repo = LibSqlBookRepository::new(db.connection());
    let updated = repo
        .update(&book.id, draft)
        .await?
        .ok_or_else(|| CliError::BookNotFound(book.id.to_string()))?;

    println!("{} (version {})", updated.id, updated.version);
    Ok(())
}
