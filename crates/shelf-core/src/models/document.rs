//! Remote catalog document model

use serde::{Deserialize, Serialize};

use super::Book;

/// The single JSON blob acting as the shared backing store across devices.
///
/// The whole document is replaced on every successful write; there is no
/// partial update. `books` is deliberately required when deserializing: a
/// remote body without it is malformed, not empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub books: Vec<Book>,
    /// Document-level counter, bumped on every push
    #[serde(default)]
    pub version: i64,
    /// When the document was last written (Unix ms)
    #[serde(default)]
    pub last_sync: Option<i64>,
}

impl CatalogDocument {
    #[must_use]
    pub fn new(books: Vec<Book>, version: i64, last_sync: Option<i64>) -> Self {
        Self {
            books,
            version,
            last_sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_books_array_is_rejected() {
        let result = serde_json::from_str::<CatalogDocument>(r#"{"version": 3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_version_and_last_sync_default() {
        let document: CatalogDocument = serde_json::from_str(r#"{"books": []}"#).unwrap();
        assert_eq!(document.version, 0);
        assert_eq!(document.last_sync, None);
    }

    #[test]
    fn test_last_sync_serializes_camel_case() {
        let document = CatalogDocument::new(Vec::new(), 2, Some(99));
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["lastSync"], 99);
    }
}
