//! Book repository implementation
//!
//! Every mutation writes the record row and its operation-log entry inside
//! one transaction: a reader never observes a record change without its log
//! entry, or the other way around.

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{Book, BookDraft, BookId, LogEntry, OperationPayload};
use crate::util::unix_timestamp_ms;

/// Aggregate result of a bulk upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub added: usize,
    pub updated: usize,
    /// Malformed input records that were skipped, not applied
    pub errors: usize,
}

/// Trait for catalog storage operations (async)
#[allow(async_fn_in_trait)]
pub trait BookRepository {
    /// Every live record, most recently updated first
    async fn list_all(&self) -> Result<Vec<Book>>;

    /// Get a record by ID
    async fn get(&self, id: &BookId) -> Result<Option<Book>>;

    /// Create a new record at version 1, generating an id when the draft
    /// has none
    async fn add(&self, draft: BookDraft) -> Result<Book>;

    /// Update an existing record, bumping its version by exactly 1.
    /// Returns `None` when the id does not exist.
    async fn update(&self, id: &BookId, draft: BookDraft) -> Result<Option<Book>>;

    /// Remove a record. Returns `false` (and appends nothing to the log)
    /// when the id does not exist.
    async fn delete(&self, id: &BookId) -> Result<bool>;

    /// Insert-or-update a batch of full records in one transaction.
    /// A malformed record is counted and skipped; a storage failure rolls
    /// the whole batch back.
    async fn bulk_upsert(&self, books: Vec<Book>) -> Result<UpsertSummary>;

    /// Log entries strictly newer than the watermark (all entries when the
    /// watermark is `None`), in `(timestamp, id)` order
    async fn operations_since(&self, watermark: Option<i64>) -> Result<Vec<LogEntry>>;

    /// Delete log entries with `timestamp <= given`, returning how many
    async fn purge_operations_up_to(&self, timestamp: i64) -> Result<u64>;

    /// Case-insensitive title/author search
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Book>>;

    /// Records in the given category, most recently updated first
    async fn list_by_category(&self, category: &str, limit: usize, offset: usize)
        -> Result<Vec<Book>>;
}

/// libSQL implementation of `BookRepository`
pub struct LibSqlBookRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlBookRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn begin(&self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.conn.execute("COMMIT", ()).await?;
        Ok(())
    }

    async fn rollback(&self) {
        self.conn.execute("ROLLBACK", ()).await.ok();
    }

    async fn insert_book_row(&self, book: &Book) -> Result<()> {
        let data = serde_json::to_string(book)?;
        self.conn
            .execute(
                "INSERT INTO books (id, title, author, category, version, created_at, updated_at, data)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    book.id.as_str(),
                    book.title.as_str(),
                    book.author.as_str(),
                    book.category.as_str(),
                    book.version,
                    book.created_at,
                    book.updated_at,
                    data
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_book_row(&self, book: &Book) -> Result<()> {
        let data = serde_json::to_string(book)?;
        self.conn
            .execute(
                "UPDATE books SET title = ?, author = ?, category = ?, version = ?, updated_at = ?, data = ?
                 WHERE id = ?",
                params![
                    book.title.as_str(),
                    book.author.as_str(),
                    book.category.as_str(),
                    book.version,
                    book.updated_at,
                    data,
                    book.id.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    async fn append_log(&self, timestamp: i64, payload: &OperationPayload) -> Result<()> {
        let body = serde_json::to_string(payload)?;
        self.conn
            .execute(
                "INSERT INTO oplog (record_id, operation, timestamp, payload) VALUES (?, ?, ?, ?)",
                params![
                    payload.record_id().as_str(),
                    payload.operation().as_str(),
                    timestamp,
                    body
                ],
            )
            .await?;
        Ok(())
    }

    async fn query_books(&self, sql: &str, query_params: impl libsql::params::IntoParams) -> Result<Vec<Book>> {
        let mut rows = self.conn.query(sql, query_params).await?;
        let mut books = Vec::new();
        while let Some(row) = rows.next().await? {
            let data: String = row.get(0)?;
            books.push(serde_json::from_str(&data)?);
        }
        Ok(books)
    }

    /// Apply one incoming record within an open transaction.
    ///
    /// Version rules: an unknown id is inserted keeping the incoming
    /// version (minimum 1); a known id takes the incoming fields with
    /// `version = max(previous + 1, incoming)` so a merge can never move a
    /// record's version backwards.
    async fn upsert_one(&self, incoming: Book, now_ms: i64) -> Result<bool> {
        let existing = self.get(&incoming.id).await?;

        match existing {
            Some(existing) => {
                let previous_version = existing.version;
                let mut record = incoming;
                record.created_at = existing.created_at;
                record.version = record.version.max(previous_version + 1);
                if record.updated_at <= 0 {
                    record.updated_at = now_ms;
                }
                self.update_book_row(&record).await?;
                self.append_log(
                    now_ms,
                    &OperationPayload::Update {
                        book: record,
                        previous_version,
                    },
                )
                .await?;
                Ok(false)
            }
            None => {
                let mut record = incoming;
                record.version = record.version.max(1);
                if record.created_at <= 0 {
                    record.created_at = now_ms;
                }
                if record.updated_at <= 0 {
                    record.updated_at = now_ms;
                }
                self.insert_book_row(&record).await?;
                self.append_log(now_ms, &OperationPayload::Add { book: record })
                    .await?;
                Ok(true)
            }
        }
    }
}

fn is_malformed(book: &Book) -> bool {
    book.id.as_str().trim().is_empty()
        || book.title.trim().is_empty()
        || book.author.trim().is_empty()
}

impl BookRepository for LibSqlBookRepository<'_> {
    async fn list_all(&self) -> Result<Vec<Book>> {
        self.query_books("SELECT data FROM books ORDER BY updated_at DESC", ())
            .await
    }

    async fn get(&self, id: &BookId) -> Result<Option<Book>> {
        let mut rows = self
            .conn
            .query("SELECT data FROM books WHERE id = ?", params![id.as_str()])
            .await?;

        match rows.next().await? {
            Some(row) => {
                let data: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn add(&self, draft: BookDraft) -> Result<Book> {
        draft.validate()?;
        let id = draft.id.clone().unwrap_or_else(BookId::generate);
        if self.get(&id).await?.is_some() {
            return Err(Error::DuplicateId(id.to_string()));
        }

        let now = unix_timestamp_ms();
        let book = Book::from_draft(draft, id, now)?;

        self.begin().await?;
        let result: Result<()> = async {
            self.insert_book_row(&book).await?;
            self.append_log(now, &OperationPayload::Add { book: book.clone() })
                .await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.commit().await?;
                Ok(book)
            }
            Err(error) => {
                self.rollback().await;
                Err(error)
            }
        }
    }

    async fn update(&self, id: &BookId, draft: BookDraft) -> Result<Option<Book>> {
        draft.validate()?;
        let Some(mut book) = self.get(id).await? else {
            return Ok(None);
        };

        let now = unix_timestamp_ms();
        let previous_version = book.version;
        book.apply_draft(draft, now)?;

        self.begin().await?;
        let result: Result<()> = async {
            self.update_book_row(&book).await?;
            self.append_log(
                now,
                &OperationPayload::Update {
                    book: book.clone(),
                    previous_version,
                },
            )
            .await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.commit().await?;
                Ok(Some(book))
            }
            Err(error) => {
                self.rollback().await;
                Err(error)
            }
        }
    }

    async fn delete(&self, id: &BookId) -> Result<bool> {
        let Some(book) = self.get(id).await? else {
            return Ok(false);
        };

        let now = unix_timestamp_ms();

        self.begin().await?;
        let result: Result<()> = async {
            self.conn
                .execute("DELETE FROM books WHERE id = ?", params![id.as_str()])
                .await?;
            self.append_log(
                now,
                &OperationPayload::Delete {
                    id: book.id.clone(),
                    title: book.title.clone(),
                },
            )
            .await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.commit().await?;
                Ok(true)
            }
            Err(error) => {
                self.rollback().await;
                Err(error)
            }
        }
    }

    async fn bulk_upsert(&self, books: Vec<Book>) -> Result<UpsertSummary> {
        let now = unix_timestamp_ms();
        let mut summary = UpsertSummary::default();

        self.begin().await?;
        let result: Result<()> = async {
            for incoming in books {
                if is_malformed(&incoming) {
                    summary.errors += 1;
                    continue;
                }
                if self.upsert_one(incoming, now).await? {
                    summary.added += 1;
                } else {
                    summary.updated += 1;
                }
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.commit().await?;
                Ok(summary)
            }
            Err(error) => {
                self.rollback().await;
                Err(error)
            }
        }
    }

    async fn operations_since(&self, watermark: Option<i64>) -> Result<Vec<LogEntry>> {
        let mut rows = match watermark {
            Some(timestamp) => {
                self.conn
                    .query(
                        "SELECT id, timestamp, payload FROM oplog
                         WHERE timestamp > ?
                         ORDER BY timestamp ASC, id ASC",
                        params![timestamp],
                    )
                    .await?
            }
            None => {
                self.conn
                    .query(
                        "SELECT id, timestamp, payload FROM oplog
                         ORDER BY timestamp ASC, id ASC",
                        (),
                    )
                    .await?
            }
        };

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: i64 = row.get(0)?;
            let timestamp: i64 = row.get(1)?;
            let payload: String = row.get(2)?;
            entries.push(LogEntry {
                id,
                timestamp,
                payload: serde_json::from_str(&payload)?,
            });
        }
        Ok(entries)
    }

    async fn purge_operations_up_to(&self, timestamp: i64) -> Result<u64> {
        let purged = self
            .conn
            .execute("DELETE FROM oplog WHERE timestamp <= ?", params![timestamp])
            .await?;
        Ok(purged)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Book>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return self.list_all().await;
        }

        let pattern = format!("%{trimmed}%");
        self.query_books(
            "SELECT data FROM books
             WHERE title LIKE ? OR author LIKE ?
             ORDER BY updated_at DESC
             LIMIT ?",
            params![pattern.clone(), pattern, limit as i64],
        )
        .await
    }

    async fn list_by_category(
        &self,
        category: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Book>> {
        self.query_books(
            "SELECT data FROM books
             WHERE category = ?
             ORDER BY updated_at DESC
             LIMIT ? OFFSET ?",
            params![category, limit as i64, offset as i64],
        )
        .await
    }
}
