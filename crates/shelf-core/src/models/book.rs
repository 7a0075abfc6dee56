//! Book record model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Sentinel category applied when a record has none.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Opaque unique identifier for a book record.
///
/// Newly created records get a UUID v7 (time-ordered with a random suffix);
/// records imported from files or pulled from a remote document keep
/// whatever opaque string they arrived with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Create a new unique book ID using UUID v7
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("book id must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// A book record in the catalog.
///
/// Field names are camelCase on the wire to match the shared remote
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier, assigned at creation, immutable
    pub id: BookId,
    /// Required title
    pub title: String,
    /// Required author
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    /// Defaults to [`UNCATEGORIZED`] when absent
    #[serde(default = "default_category")]
    pub category: String,
    /// Physical placement: which cabinet the book lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cabinet: Option<String>,
    /// Physical placement: which shelf row within the cabinet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Starts at 1, incremented by exactly 1 on every successful update
    #[serde(default = "default_version")]
    pub version: i64,
    /// Creation timestamp (Unix ms), set once
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

const fn default_version() -> i64 {
    1
}

impl Book {
    /// Build a fresh version-1 record from a validated draft.
    pub fn from_draft(draft: BookDraft, id: BookId, now_ms: i64) -> Result<Self> {
        draft.validate()?;
        let draft = draft.normalized();
        Ok(Self {
            id,
            title: draft.title,
            author: draft.author,
            series: draft.series,
            category: draft.category.unwrap_or_else(default_category),
            cabinet: draft.cabinet,
            row: draft.row,
            publisher: draft.publisher,
            description: draft.description,
            isbn: draft.isbn,
            notes: draft.notes,
            version: 1,
            created_at: now_ms,
            updated_at: now_ms,
        })
    }

    /// Overwrite this record's fields from a validated draft.
    ///
    /// Preserves `id` and `created_at`, bumps `version` by exactly 1 and
    /// stamps `updated_at`.
    pub fn apply_draft(&mut self, draft: BookDraft, now_ms: i64) -> Result<()> {
        draft.validate()?;
        let draft = draft.normalized();
        self.title = draft.title;
        self.author = draft.author;
        self.series = draft.series;
        self.category = draft.category.unwrap_or_else(default_category);
        self.cabinet = draft.cabinet;
        self.row = draft.row;
        self.publisher = draft.publisher;
        self.description = draft.description;
        self.isbn = draft.isbn;
        self.notes = draft.notes;
        self.version += 1;
        self.updated_at = now_ms;
        Ok(())
    }

    /// A draft carrying this record's current fields, for partial edits.
    #[must_use]
    pub fn to_draft(&self) -> BookDraft {
        BookDraft {
            id: Some(self.id.clone()),
            title: self.title.clone(),
            author: self.author.clone(),
            series: self.series.clone(),
            category: Some(self.category.clone()),
            cabinet: self.cabinet.clone(),
            row: self.row.clone(),
            publisher: self.publisher.clone(),
            description: self.description.clone(),
            isbn: self.isbn.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// Caller-facing input for add and update operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    /// Optional explicit id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BookId>,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cabinet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BookDraft {
    /// Create a draft with the two required fields.
    #[must_use]
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// Require non-empty title and author.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("title must not be empty".into()));
        }
        if self.author.trim().is_empty() {
            return Err(Error::InvalidInput("author must not be empty".into()));
        }
        Ok(())
    }

    /// Trim all fields and drop empty optionals.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            id: self.id,
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            series: normalize_text_option(self.series),
            category: normalize_text_option(self.category),
            cabinet: normalize_text_option(self.cabinet),
            row: normalize_text_option(self.row),
            publisher: normalize_text_option(self.publisher),
            description: normalize_text_option(self.description),
            isbn: normalize_text_option(self.isbn),
            notes: normalize_text_option(self.notes),
        }
    }
}
