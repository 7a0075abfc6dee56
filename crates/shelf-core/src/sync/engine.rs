//! Sync engine orchestrating push, pull, and consistency checks.
//!
//! Ordering rules baked into the push path: the merged document is written
//! before anything local changes, the watermark only advances after a
//! successful write, and the log purge never outruns the watermark. A crash
//! mid-sync therefore re-runs from the old watermark, which is safe because
//! the merge is idempotent per record.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::db::{
    BookRepository, Database, LibSqlBookRepository, LibSqlSettingsRepository,
};
use crate::error::{Error, Result};
use crate::models::CatalogDocument;
use crate::remote::RemoteDocumentClient;
use crate::util::unix_timestamp_ms;

use super::merge;

/// Why a sync attempt ended without touching the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No remote credentials/location configured
    NotConfigured,
    /// The watermark is younger than the minimum re-check interval
    TooRecent,
    /// The remote document version is behind what we already recorded
    RemoteNotNewer,
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotConfigured => "not configured",
            Self::TooRecent => "too recent",
            Self::RemoteNotNewer => "remote not newer",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a sync attempt that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    /// Local changes were merged into the remote document
    Pushed { changes: usize },
    /// The remote document was applied to the local store
    Pulled {
        added: usize,
        updated: usize,
        total: usize,
        /// The bundled snapshot stood in for an unreachable remote
        from_seed: bool,
    },
    Skipped(SkipReason),
}

/// Read-only comparison of local records against the remote document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub consistent: bool,
    pub local_count: usize,
    pub remote_count: usize,
    /// Ids missing on either side, or present on both with differing
    /// versions
    pub mismatched: Vec<String>,
}

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Minimum watermark age before an unforced sync re-runs
    pub min_recheck: Duration,
    /// Write attempts per push before surfacing an error
    pub write_attempts: u32,
    /// Fixed delay between conflict/transient retries
    pub retry_delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            min_recheck: Duration::from_secs(30 * 60),
            write_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Orchestrates the record store and a remote document client.
pub struct SyncEngine<R> {
    db: Arc<Database>,
    remote: Option<R>,
    options: SyncOptions,
    fallback: Option<CatalogDocument>,
}

impl<R: RemoteDocumentClient> SyncEngine<R> {
    pub fn new(db: Arc<Database>, remote: Option<R>) -> Self {
        Self {
            db,
            remote,
            options: SyncOptions::default(),
            fallback: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Provide the bundled read-only snapshot used when a pull cannot
    /// reach the remote.
    #[must_use]
    pub fn with_fallback(mut self, document: CatalogDocument) -> Self {
        self.fallback = Some(document);
        self
    }

    pub const fn is_configured(&self) -> bool {
        self.remote.is_some()
    }

    fn books(&self) -> LibSqlBookRepository<'_> {
        LibSqlBookRepository::new(self.db.connection())
    }

    fn settings(&self) -> LibSqlSettingsRepository<'_> {
        LibSqlSettingsRepository::new(self.db.connection())
    }

    async fn synced_too_recently(&self, now_ms: i64) -> Result<bool> {
        let Some(watermark) = self.settings().watermark().await? else {
            return Ok(false);
        };
        let age = now_ms - watermark;
        let threshold = i64::try_from(self.options.min_recheck.as_millis()).unwrap_or(i64::MAX);
        Ok(age < threshold)
    }

    /// Push local operation-log entries into the remote document.
    ///
    /// An empty delta succeeds with zero changes and no network call. On a
    /// write conflict the remote is re-read and the delta re-merged onto
    /// the fresh base, up to the configured attempt bound.
    pub async fn sync_to_remote(&self, force: bool) -> Result<SyncReport> {
        let Some(remote) = self.remote.as_ref() else {
            return Ok(SyncReport::Skipped(SkipReason::NotConfigured));
        };
        let now = unix_timestamp_ms();
        if !force && self.synced_too_recently(now).await? {
            return Ok(SyncReport::Skipped(SkipReason::TooRecent));
        }

        let watermark = self.settings().watermark().await?;
        let delta = self.books().operations_since(watermark).await?;
        if delta.is_empty() {
            tracing::debug!("no local changes to push");
            return Ok(SyncReport::Pushed { changes: 0 });
        }

        let snapshot = remote.read().await?;
        let mut base = snapshot.document.unwrap_or_default();
        let mut token = snapshot.token;

        let mut attempt = 1u32;
        loop {
            let merged = CatalogDocument {
                books: merge::apply_operations(base.books.clone(), &delta),
                version: base.version + 1,
                last_sync: Some(unix_timestamp_ms()),
            };

            match remote.write(&merged, token.as_deref()).await {
                Ok(_new_token) => {
                    let synced_at = unix_timestamp_ms();
                    self.settings().set_watermark(synced_at).await?;
                    self.settings().set_data_version(merged.version).await?;
                    let purged = self.books().purge_operations_up_to(synced_at).await?;
                    tracing::info!(
                        changes = delta.len(),
                        purged,
                        "pushed local changes to remote"
                    );
                    return Ok(SyncReport::Pushed {
                        changes: delta.len(),
                    });
                }
                Err(error @ Error::Conflict(_)) => {
                    if attempt >= self.options.write_attempts {
                        return Err(error);
                    }
                    attempt += 1;
                    tracing::warn!(attempt, "remote document changed underneath us, retrying");
                    tokio::time::sleep(self.options.retry_delay).await;
                    let fresh = remote.read().await?;
                    base = fresh.document.unwrap_or_default();
                    token = fresh.token;
                }
                Err(error) if error.is_transient() => {
                    if attempt >= self.options.write_attempts {
                        return Err(error);
                    }
                    attempt += 1;
                    tracing::warn!(attempt, %error, "transient remote failure, retrying write");
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Apply the remote document to the local store.
    ///
    /// An unreachable remote on an unforced call degrades to the bundled
    /// fallback snapshot when one is configured; authorization and format
    /// errors always propagate.
    pub async fn sync_from_remote(&self, force: bool) -> Result<SyncReport> {
        let Some(remote) = self.remote.as_ref() else {
            return Ok(SyncReport::Skipped(SkipReason::NotConfigured));
        };
        let now = unix_timestamp_ms();
        if !force && self.synced_too_recently(now).await? {
            return Ok(SyncReport::Skipped(SkipReason::TooRecent));
        }

        let snapshot = match remote.read().await {
            Ok(snapshot) => snapshot,
            Err(error) if !force && error.is_transient() => {
                let Some(seed) = self.fallback.clone() else {
                    return Err(error);
                };
                tracing::warn!(%error, "remote unreachable, seeding from bundled snapshot");
                let summary = self.books().bulk_upsert(seed.books.clone()).await?;
                return Ok(SyncReport::Pulled {
                    added: summary.added,
                    updated: summary.updated,
                    total: seed.books.len(),
                    from_seed: true,
                });
            }
            Err(error) => return Err(error),
        };

        let Some(document) = snapshot.document else {
            tracing::debug!("remote document does not exist yet, nothing to pull");
            return Ok(SyncReport::Pulled {
                added: 0,
                updated: 0,
                total: 0,
                from_seed: false,
            });
        };

        let recorded_version = self.settings().data_version().await?.unwrap_or(0);
        if !force && document.version < recorded_version {
            tracing::debug!(
                remote = document.version,
                local = recorded_version,
                "remote document is older than what we already applied"
            );
            return Ok(SyncReport::Skipped(SkipReason::RemoteNotNewer));
        }

        let total = document.books.len();
        let summary = self.books().bulk_upsert(document.books).await?;
        self.settings().set_data_version(document.version).await?;
        self.settings().set_watermark(unix_timestamp_ms()).await?;
        tracing::info!(
            added = summary.added,
            updated = summary.updated,
            total,
            "pulled remote catalog"
        );
        Ok(SyncReport::Pulled {
            added: summary.added,
            updated: summary.updated,
            total,
            from_seed: false,
        })
    }

    /// Push local changes, then pull when the push moved nothing.
    ///
    /// This is the scheduler's one-shot "bring both sides together" step:
    /// local edits win the network round trip; with nothing to push, a
    /// remote that moved ahead still gets applied.
    pub async fn sync(&self, force: bool) -> Result<SyncReport> {
        match self.sync_to_remote(force).await? {
            SyncReport::Pushed { changes: 0 } => self.sync_from_remote(force).await,
            report => Ok(report),
        }
    }

    /// Compare local records against the remote document without mutating
    /// either side.
    pub async fn check_consistency(&self) -> Result<ConsistencyReport> {
        let Some(remote) = self.remote.as_ref() else {
            return Err(Error::InvalidInput("sync is not configured".into()));
        };

        let snapshot = remote.read().await?;
        let remote_books = snapshot
            .document
            .map(|document| document.books)
            .unwrap_or_default();
        let local_books = self.books().list_all().await?;

        let remote_versions: HashMap<&str, i64> = remote_books
            .iter()
            .map(|book| (book.id.as_str(), book.version))
            .collect();

        let mut mismatched = Vec::new();
        for book in &local_books {
            match remote_versions.get(book.id.as_str()) {
                Some(&version) if version == book.version => {}
                _ => mismatched.push(book.id.to_string()),
            }
        }
        let local_ids: HashMap<&str, i64> = local_books
            .iter()
            .map(|book| (book.id.as_str(), book.version))
            .collect();
        for book in &remote_books {
            if !local_ids.contains_key(book.id.as_str()) {
                mismatched.push(book.id.to_string());
            }
        }
        mismatched.sort();
        mismatched.dedup();

        let report = ConsistencyReport {
            consistent: mismatched.is_empty() && local_books.len() == remote_books.len(),
            local_count: local_books.len(),
            remote_count: remote_books.len(),
            mismatched,
        };
        if !report.consistent {
            tracing::debug!(
                local = report.local_count,
                remote = report.remote_count,
                mismatched = report.mismatched.len(),
                "catalog diverged from remote"
            );
        }
        Ok(report)
    }
}
