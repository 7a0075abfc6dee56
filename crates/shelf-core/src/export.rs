//! Catalog export rendering shared by all callers.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::Book;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

const CSV_HEADER: &str =
    "id,title,author,series,category,cabinet,row,publisher,isbn,notes,version,createdAt,updatedAt";

/// Render records as pretty-printed JSON, the same shape `import` accepts.
pub fn render_json_export(books: &[Book]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(books)
}

/// Render records as CSV with a fixed header row.
#[must_use]
pub fn render_csv_export(books: &[Book]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{CSV_HEADER}");

    for book in books {
        let fields = [
            book.id.as_str(),
            &book.title,
            &book.author,
            book.series.as_deref().unwrap_or(""),
            &book.category,
            book.cabinet.as_deref().unwrap_or(""),
            book.row.as_deref().unwrap_or(""),
            book.publisher.as_deref().unwrap_or(""),
            book.isbn.as_deref().unwrap_or(""),
            book.notes.as_deref().unwrap_or(""),
        ];
        let row = fields
            .iter()
            .map(|field| csv_escape(field))
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(
            output,
            "{row},{},{},{}",
            book.version, book.created_at, book.updated_at
        );
    }

    output
}

/// Render records in the selected format.
pub fn render_export(books: &[Book], format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(books),
        ExportFormat::Csv => Ok(render_csv_export(books)),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("shelf-export-{timestamp_ms}.{}", format.extension())
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
