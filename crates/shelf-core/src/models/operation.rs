//! Operation log model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{Book, BookId};

/// Mutation kind recorded in the operation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(Self::Add),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown operation: {other}"))),
        }
    }
}

/// Payload stored with each log entry.
///
/// Add and update carry the full record as it stood after the mutation;
/// delete carries a minimal tombstone. Updates also remember the version
/// the record had before the mutation so stale merges can be detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum OperationPayload {
    Add { book: Book },
    Update { book: Book, previous_version: i64 },
    Delete { id: BookId, title: String },
}

impl OperationPayload {
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Add { .. } => Operation::Add,
            Self::Update { .. } => Operation::Update,
            Self::Delete { .. } => Operation::Delete,
        }
    }

    /// The id of the record this mutation touched.
    #[must_use]
    pub const fn record_id(&self) -> &BookId {
        match self {
            Self::Add { book } | Self::Update { book, .. } => &book.id,
            Self::Delete { id, .. } => id,
        }
    }
}

/// One appended entry in the operation log.
///
/// Entries for a given record are totally ordered by `(timestamp, id)`;
/// the row id breaks ties between mutations landing in the same
/// millisecond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Monotonic row id
    pub id: i64,
    /// Creation time of this entry (Unix ms), the sync watermark unit
    pub timestamp: i64,
    pub payload: OperationPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookDraft;

    fn sample_book() -> Book {
        Book::from_draft(
            BookDraft::new("Dune", "Frank Herbert"),
            "b1".parse().unwrap(),
            1_000,
        )
        .unwrap()
    }

    #[test]
    fn test_operation_round_trips_as_str() {
        for op in [Operation::Add, Operation::Update, Operation::Delete] {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!("drop".parse::<Operation>().is_err());
    }

    #[test]
    fn test_payload_serde_is_tagged_by_operation() {
        let payload = OperationPayload::Update {
            book: sample_book(),
            previous_version: 3,
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["operation"], "update");
        assert_eq!(json["previousVersion"], 3);
        assert_eq!(json["book"]["title"], "Dune");

        let back: OperationPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_delete_payload_is_a_minimal_tombstone() {
        let payload = OperationPayload::Delete {
            id: "b1".parse().unwrap(),
            title: "Dune".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["operation"], "delete");
        assert_eq!(json["id"], "b1");
        assert!(json.get("book").is_none());
    }

    #[test]
    fn test_record_id_matches_affected_record() {
        let book = sample_book();
        let add = OperationPayload::Add { book: book.clone() };
        assert_eq!(add.record_id(), &book.id);
        assert_eq!(add.operation(), Operation::Add);

        let delete = OperationPayload::Delete {
            id: book.id.clone(),
            title: book.title,
        };
        assert_eq!(delete.record_id(), &book.id);
    }
}
