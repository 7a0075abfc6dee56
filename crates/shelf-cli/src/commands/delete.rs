use std::path::Path;

use shelf_core::db::{BookRepository, LibSqlBookRepository};

use crate::commands::common::{open_database, resolve_book};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let book = resolve_book(id, &db).await?;

    let repo = LibSqlBookRepository::new(db.connection());
    if repo.delete(&book.id).await? {
        println!("{}", book.id);
    } else {
        return Err(CliError::BookNotFound(book.id.to_string()));
    }
    Ok(())
}
