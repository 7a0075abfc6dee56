use std::path::Path;

use shelf_core::db::{BookRepository, LibSqlBookRepository};
use shelf_core::BookDraft;

use crate::cli::BookFields;
use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_add(
    title: String,
    author: String,
    fields: BookFields,
    db_path: &Path,
) -> Result<(), CliError> {
    let draft = BookDraft {
        title,
        author,
        series: fields.series,
        category: fields.category,
        cabinet: fields.cabinet,
        row: fields.row,
        publisher: fields.publisher,
        description: fields.description,
        isbn: fields.isbn,
        notes: fields.notes,
        ..BookDraft::default()
    };

    let db = open_database(db_path).await?;
    let repo = LibSqlBookRepository::new(db.connection());
    let book = repo.add(draft).await?;

    println!("{}", book.id);
    Ok(())
}
