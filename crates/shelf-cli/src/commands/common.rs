use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use shelf_core::db::{BookRepository, Database, LibSqlBookRepository, LibSqlSettingsRepository};
use shelf_core::models::CatalogDocument;
use shelf_core::remote::GitHubContentsClient;
use shelf_core::sync::SyncEngine;
use shelf_core::{Book, BookDraft, BookId};

use crate::cli::BookFields;
use crate::error::CliError;

/// Bundled read-only snapshot used when a pull cannot reach the remote.
const SEED_SNAPSHOT: &str = include_str!("../../assets/seed.json");

#[derive(Debug, Serialize)]
pub struct BookListItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub cabinet: Option<String>,
    pub row: Option<String>,
    pub version: i64,
    pub updated_at: i64,
    pub relative_time: String,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("SHELF_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelf")
        .join("shelf.db")
}

pub async fn open_database(path: &Path) -> Result<Arc<Database>, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(Database::open(path).await?))
}

/// Parse the bundled fallback snapshot.
pub fn seed_document() -> Option<CatalogDocument> {
    match serde_json::from_str(SEED_SNAPSHOT) {
        Ok(document) => Some(document),
        Err(error) => {
            tracing::warn!(%error, "bundled seed snapshot is unreadable");
            None
        }
    }
}

/// Build a sync engine from the stored remote configuration.
///
/// An unconfigured remote yields an engine that reports skips rather than
/// an error, so status output still works before first-time setup.
pub async fn build_engine(
    db: &Arc<Database>,
) -> Result<SyncEngine<GitHubContentsClient>, CliError> {
    let settings = LibSqlSettingsRepository::new(db.connection());
    let remote = match settings.remote_config().await? {
        Some(config) if config.is_configured() => Some(GitHubContentsClient::new(config)?),
        _ => None,
    };

    let mut engine = SyncEngine::new(Arc::clone(db), remote);
    if let Some(seed) = seed_document() {
        engine = engine.with_fallback(seed);
    }
    Ok(engine)
}

/// Resolve a book by exact id or unique id prefix.
pub async fn resolve_book(book_query: &str, db: &Database) -> Result<Book, CliError> {
    let trimmed = book_query.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyBookId);
    }

    let repo = LibSqlBookRepository::new(db.connection());
    if let Ok(book_id) = trimmed.parse::<BookId>() {
        if let Some(book) = repo.get(&book_id).await? {
            return Ok(book);
        }
    }

    let mut rows = db
        .connection()
        .query(
            "SELECT id
             FROM books
             WHERE id LIKE ?
             ORDER BY updated_at DESC
             LIMIT ?",
            libsql::params![format!("{trimmed}%"), 3i64],
        )
        .await?;

    let mut matching_ids = Vec::new();
    while let Some(row) = rows.next().await? {
        let id: String = row.get(0)?;
        matching_ids.push(id);
    }

    match matching_ids.len() {
        0 => Err(CliError::BookNotFound(trimmed.to_string())),
        1 => {
            let resolved_id = matching_ids[0]
                .parse::<BookId>()
                .map_err(|_| CliError::BookNotFound(trimmed.to_string()))?;
            repo.get(&resolved_id)
                .await?
                .ok_or_else(|| CliError::BookNotFound(trimmed.to_string()))
        }
        _ => {
            let options = matching_ids
                .iter()
                .take(3)
                .map(|id| id.chars().take(13).collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousBookId(format!(
                "ID prefix '{trimmed}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Fold optional edit flags onto an existing record's draft.
pub fn merge_fields(
    mut draft: BookDraft,
    title: Option<String>,
    author: Option<String>,
    fields: BookFields,
) -> BookDraft {
    if let Some(title) = title {
        draft.title = title;
    }
    if let Some(author) = author {
        draft.author = author;
    }
    if fields.series.is_some() {
        draft.series = fields.series;
    }
    if fields.category.is_some() {
        draft.category = fields.category;
    }
    if fields.cabinet.is_some() {
        draft.cabinet = fields.cabinet;
    }
    if fields.row.is_some() {
        draft.row = fields.row;
    }
    if fields.publisher.is_some() {
        draft.publisher = fields.publisher;
    }
    if fields.description.is_some() {
        draft.description = fields.description;
    }
    if fields.isbn.is_some() {
        draft.isbn = fields.isbn;
    }
    if fields.notes.is_some() {
        draft.notes = fields.notes;
    }
    draft
}

pub fn book_to_list_item(book: &Book) -> BookListItem {
    let now_ms = Utc::now().timestamp_millis();
    BookListItem {
        id: book.id.to_string(),
        title: book.title.clone(),
        author: book.author.clone(),
        category: book.category.clone(),
        cabinet: book.cabinet.clone(),
        row: book.row.clone(),
        version: book.version,
        updated_at: book.updated_at,
        relative_time: format_relative_time(book.updated_at, now_ms),
    }
}

pub fn format_book_lines(books: &[Book]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    books
        .iter()
        .map(|book| {
            let id = book.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let title = truncate(&book.title, 32);
            let author = truncate(&book.author, 20);
            let place = match (book.cabinet.as_deref(), book.row.as_deref()) {
                (Some(cabinet), Some(row)) => format!("{cabinet}/{row}"),
                (Some(cabinet), None) => cabinet.to_string(),
                (None, Some(row)) => format!("-/{row}"),
                (None, None) => String::new(),
            };
            let relative_time = format_relative_time(book.updated_at, now_ms);

            if place.is_empty() {
                format!("{short_id:<13}  {title:<32}  {author:<20}  {relative_time}")
            } else {
                format!(
                    "{short_id:<13}  {title:<32}  {author:<20}  {place:<8}  {relative_time}"
                )
            }
        })
        .collect()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
