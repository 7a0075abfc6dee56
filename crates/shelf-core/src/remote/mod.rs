//! Remote catalog document clients

mod github;
mod memory;

use std::future::Future;

pub use github::GitHubContentsClient;
pub use memory::InMemoryRemote;

use crate::error::Result;
use crate::models::CatalogDocument;

/// One read of the remote document together with its content token.
///
/// Both fields are `None` when the document does not exist yet; that is an
/// ordinary state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub document: Option<CatalogDocument>,
    pub token: Option<String>,
}

/// Content-addressed store holding the single shared catalog document.
///
/// `read` returns the current document plus an opaque content token;
/// `write` replaces the whole document and must present the token from the
/// last read (or `None` to create), failing with `Error::Conflict` when
/// the token is stale. The compare-and-swap shape is what keeps two
/// devices syncing the same backing document safe. Location addressing and
/// body encoding are implementation details hidden behind this trait.
pub trait RemoteDocumentClient: Send + Sync {
    /// Read the current document and its content token.
    fn read(&self) -> impl Future<Output = Result<RemoteSnapshot>> + Send;

    /// Replace the document, returning the new content token.
    fn write(
        &self,
        document: &CatalogDocument,
        expected_token: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Shared handles work wherever a client does.
impl<T: RemoteDocumentClient> RemoteDocumentClient for std::sync::Arc<T> {
    async fn read(&self) -> Result<RemoteSnapshot> {
        (**self).read().await
    }

    async fn write(
        &self,
        document: &CatalogDocument,
        expected_token: Option<&str>,
    ) -> Result<String> {
        (**self).write(document, expected_token).await
    }
}
