//! In-memory remote document store.
//!
//! Implements the same compare-and-swap contract as the GitHub client
//! against process-local state. The sync engine and scheduler tests run
//! against it; the call counters and programmable failures exist for them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::CatalogDocument;

use super::{RemoteDocumentClient, RemoteSnapshot};

#[derive(Debug, Default)]
struct StoredDocument {
    document: Option<CatalogDocument>,
    revision: u64,
}

/// Process-local `RemoteDocumentClient` with injectable failures.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    state: Mutex<StoredDocument>,
    latency: Mutex<Duration>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    conflicts_to_inject: AtomicUsize,
    outages_to_inject: AtomicUsize,
}

impl InMemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing document at revision 1.
    #[must_use]
    pub fn with_document(document: CatalogDocument) -> Self {
        let remote = Self::default();
        {
            let mut state = remote.lock_state();
            state.document = Some(document);
            state.revision = 1;
        }
        remote
    }

    /// How many `read` calls were made.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// How many `write` calls were made.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make the next `count` writes fail with `Conflict`.
    pub fn inject_write_conflicts(&self, count: usize) {
        self.conflicts_to_inject.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` reads fail with `RemoteUnavailable`.
    pub fn inject_read_outages(&self, count: usize) {
        self.outages_to_inject.store(count, Ordering::SeqCst);
    }

    /// Delay every call, so overlapping callers actually overlap.
    pub fn set_latency(&self, latency: Duration) {
        *self
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Snapshot of the currently stored document.
    pub fn current_document(&self) -> Option<CatalogDocument> {
        self.lock_state().document.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, StoredDocument> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn token_for(revision: u64) -> String {
        format!("rev-{revision}")
    }

    async fn pause(&self) {
        let latency = *self
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn take_injected(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl RemoteDocumentClient for InMemoryRemote {
    async fn read(&self) -> Result<RemoteSnapshot> {
        self.pause().await;
        self.reads.fetch_add(1, Ordering::SeqCst);

        if take_injected(&self.outages_to_inject) {
            return Err(Error::RemoteUnavailable("injected outage".into()));
        }

        let state = self.lock_state();
        Ok(RemoteSnapshot {
            document: state.document.clone(),
            token: state
                .document
                .is_some()
                .then(|| Self::token_for(state.revision)),
        })
    }

    async fn write(
        &self,
        document: &CatalogDocument,
        expected_token: Option<&str>,
    ) -> Result<String> {
        self.pause().await;
        self.writes.fetch_add(1, Ordering::SeqCst);

        if take_injected(&self.conflicts_to_inject) {
            return Err(Error::Conflict("injected conflict".into()));
        }

        let mut state = self.lock_state();
        let current_token = state
            .document
            .is_some()
            .then(|| Self::token_for(state.revision));

        if expected_token != current_token.as_deref() {
            return Err(Error::Conflict(format!(
                "expected token {expected_token:?}, current is {current_token:?}"
            )));
        }

        state.document = Some(document.clone());
        state.revision += 1;
        Ok(Self::token_for(state.revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_read_of_missing_document_is_empty_not_an_error() {
        let remote = InMemoryRemote::new();
        let snapshot = remote.read().await.unwrap();
        assert_eq!(snapshot.document, None);
        assert_eq!(snapshot.token, None);
        assert_eq!(remote.read_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_then_update_with_matching_token() {
        let remote = InMemoryRemote::new();
        let document = CatalogDocument::new(Vec::new(), 1, None);

        let token = remote.write(&document, None).await.unwrap();
        let snapshot = remote.read().await.unwrap();
        assert_eq!(snapshot.token.as_deref(), Some(token.as_str()));

        let next = CatalogDocument::new(Vec::new(), 2, None);
        remote.write(&next, Some(&token)).await.unwrap();
        assert_eq!(remote.current_document().unwrap().version, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stale_token_conflicts() {
        let remote = InMemoryRemote::new();
        let document = CatalogDocument::new(Vec::new(), 1, None);

        let stale = remote.write(&document, None).await.unwrap();
        remote.write(&document, Some(&stale)).await.unwrap();

        let error = remote.write(&document, Some(&stale)).await.unwrap_err();
        assert!(matches!(error, Error::Conflict(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_over_existing_document_conflicts() {
        let remote = InMemoryRemote::with_document(CatalogDocument::default());
        let error = remote
            .write(&CatalogDocument::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Conflict(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_injected_failures_are_consumed() {
        let remote = InMemoryRemote::new();
        remote.inject_read_outages(1);

        assert!(remote.read().await.is_err());
        assert!(remote.read().await.is_ok());

        remote.inject_write_conflicts(2);
        let document = CatalogDocument::default();
        assert!(remote.write(&document, None).await.is_err());
        assert!(remote.write(&document, None).await.is_err());
        assert!(remote.write(&document, None).await.is_ok());
    }
}
