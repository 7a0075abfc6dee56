use std::path::Path;

use shelf_core::db::{BookRepository, LibSqlBookRepository};

use crate::commands::common::{book_to_list_item, format_book_lines, open_database, BookListItem};
use crate::error::CliError;

pub async fn run_search(
    query: &str,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlBookRepository::new(db.connection());
    let books = repo.search(query, limit).await?;

    if as_json {
        let items = books
            .iter()
            .map(book_to_list_item)
            .collect::<Vec<BookListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if books.is_empty() {
        println!("No books matched '{}'.", query.trim());
    } else {
        for line in format_book_lines(&books) {
            println!("{line}");
        }
    }

    Ok(())
}
