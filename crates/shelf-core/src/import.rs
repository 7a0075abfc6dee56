//! Field normalization for imported catalog rows.
//!
//! Import adapters (spreadsheets, JSON dumps from other tools) produce
//! loosely-shaped rows with localized or aliased column names. Everything
//! funnels through here so the same canonical fields and the same category
//! default apply no matter where a record came from, before it ever
//! reaches `bulk_upsert`.
//!
//! Deliberately not handled here: de-duplication of equivalent records.
//! Whether two rows are "the same book" (same title+author? same ISBN?) is
//! the importing caller's policy decision.

use serde_json::Value;

use crate::models::{Book, BookId};
use crate::util::unix_timestamp_ms;

/// Result of normalizing a batch of raw rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBatch {
    /// Records ready for `bulk_upsert`
    pub books: Vec<Book>,
    /// Rows that could not be mapped to a valid record
    pub errors: usize,
}

/// Map a batch of raw JSON rows onto catalog records.
///
/// Rows missing a usable title or author are counted as errors and
/// skipped; they never abort the batch.
#[must_use]
pub fn normalize_rows(rows: &[Value]) -> ImportBatch {
    let now = unix_timestamp_ms();
    let mut batch = ImportBatch::default();

    for row in rows {
        match normalize_row(row, now) {
            Some(book) => batch.books.push(book),
            None => batch.errors += 1,
        }
    }

    batch
}

fn normalize_row(row: &Value, now_ms: i64) -> Option<Book> {
    let object = row.as_object()?;

    let mut title = None;
    let mut author = None;
    let mut id = None;
    let mut version = None;
    let mut created_at = None;
    let mut updated_at = None;
    let mut series = None;
    let mut category = None;
    let mut cabinet = None;
    let mut shelf_row = None;
    let mut publisher = None;
    let mut description = None;
    let mut isbn = None;
    let mut notes = None;

    for (raw_key, value) in object {
        let Some(field) = canonical_field(raw_key) else {
            continue;
        };
        match field {
            "id" => id = text_value(value),
            "title" => title = text_value(value),
            "author" => author = text_value(value),
            "series" => series = text_value(value),
            "category" => category = text_value(value),
            "cabinet" => cabinet = text_value(value),
            "row" => shelf_row = text_value(value),
            "publisher" => publisher = text_value(value),
            "description" => description = text_value(value),
            "isbn" => isbn = text_value(value),
            "notes" => notes = text_value(value),
            "version" => version = value.as_i64(),
            "created_at" => created_at = value.as_i64(),
            "updated_at" => updated_at = value.as_i64(),
            _ => {}
        }
    }

    let title = title?;
    let author = author?;
    let id: BookId = match id {
        Some(raw) => raw.parse().ok()?,
        None => BookId::generate(),
    };

    Some(Book {
        id,
        title,
        author,
        series,
        category: category.unwrap_or_else(|| crate::models::UNCATEGORIZED.to_string()),
        cabinet,
        row: shelf_row,
        publisher,
        description,
        isbn,
        notes,
        version: version.filter(|v| *v >= 1).unwrap_or(1),
        created_at: created_at.unwrap_or(now_ms),
        updated_at: updated_at.unwrap_or(now_ms),
    })
}

/// Map a localized or aliased column header onto its canonical field name.
fn canonical_field(header: &str) -> Option<&'static str> {
    let key = header.trim().to_lowercase();
    let field = match key.as_str() {
        "id" | "编号" | "編號" => "id",
        "title" | "书名" | "書名" | "标题" | "標題" => "title",
        "author" | "作者" => "author",
        "series" | "系列" | "丛书" | "叢書" => "series",
        "category" | "分类" | "分類" | "类别" | "類別" => "category",
        "cabinet" | "书柜" | "書櫃" | "柜" | "櫃" => "cabinet",
        "row" | "层" | "層" | "排" => "row",
        "publisher" | "出版社" => "publisher",
        "description" | "简介" | "簡介" | "描述" => "description",
        "isbn" => "isbn",
        "notes" | "备注" | "備註" => "notes",
        "version" => "version",
        "createdat" | "created_at" => "created_at",
        "updatedat" | "updated_at" => "updated_at",
        _ => return None,
    };
    Some(field)
}

/// Coerce a JSON value to trimmed non-empty text.
///
/// Spreadsheet exports routinely carry numbers where we expect strings
/// (cabinet and row numbers especially).
fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
