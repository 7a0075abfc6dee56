//! Last-writer-wins merge of operation-log entries onto a base document.
//!
//! The winner of a per-record conflict is decided by the monotonically
//! increasing record version, not wall-clock time, so clock skew between
//! devices cannot flip an outcome.

use crate::models::{Book, LogEntry, OperationPayload};

/// Fold operation-log entries onto a base book list.
///
/// Entries must be supplied in log order. The version guard makes
/// re-applying an already-reflected entry a no-op, so replaying a stale
/// delta after an interrupted sync is safe.
#[must_use]
pub fn apply_operations(base: Vec<Book>, entries: &[LogEntry]) -> Vec<Book> {
    let mut books = base;
    for entry in entries {
        apply_payload(&mut books, &entry.payload);
    }
    books
}

fn apply_payload(books: &mut Vec<Book>, payload: &OperationPayload) {
    match payload {
        OperationPayload::Add { book } | OperationPayload::Update { book, .. } => {
            upsert_if_newer(books, book);
        }
        // Deletes always win, even against a base record with a higher
        // version; a later add with a higher version can still resurrect
        // the id
        OperationPayload::Delete { id, .. } => {
            books.retain(|book| &book.id != id);
        }
    }
}

/// Replace the base record only when the incoming snapshot is strictly
/// newer; on a tie the base (another writer's accepted state) is kept.
fn upsert_if_newer(books: &mut Vec<Book>, incoming: &Book) {
    match books.iter_mut().find(|book| book.id == incoming.id) {
        Some(existing) => {
            if incoming.version > existing.version {
                *existing = incoming.clone();
            }
        }
        None => books.push(incoming.clone()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{BookDraft, BookId};

    fn book(id: &str, title: &str, version: i64) -> Book {
        let mut book = Book::from_draft(
            BookDraft::new(title, "Author"),
            id.parse::<BookId>().unwrap(),
            1_000,
        )
        .unwrap();
        book.version = version;
        book
    }

    fn entry(id: i64, timestamp: i64, payload: OperationPayload) -> LogEntry {
        LogEntry {
            id,
            timestamp,
            payload,
        }
    }

    #[test]
    fn test_add_inserts_into_empty_base() {
        let added = book("b1", "Dune", 1);
        let merged = apply_operations(
            Vec::new(),
            &[entry(1, 10, OperationPayload::Add { book: added.clone() })],
        );
        assert_eq!(merged, vec![added]);
    }

    #[test]
    fn test_update_replaces_only_strictly_newer() {
        let base = vec![book("b1", "Dune (remote)", 4)];

        // Same version loses the tie: the base is kept
        let stale = apply_operations(
            base.clone(),
            &[entry(
                1,
                10,
                OperationPayload::Update {
                    book: book("b1", "Dune (local)", 4),
                    previous_version: 3,
                },
            )],
        );
        assert_eq!(stale[0].title, "Dune (remote)");

        // A strictly newer version wins
        let fresh = apply_operations(
            base,
            &[entry(
                1,
                10,
                OperationPayload::Update {
                    book: book("b1", "Dune (local)", 5),
                    previous_version: 4,
                },
            )],
        );
        assert_eq!(fresh[0].title, "Dune (local)");
        assert_eq!(fresh[0].version, 5);
    }

    #[test]
    fn test_add_with_newer_version_replaces_base_record() {
        let base = vec![book("b1", "Dune (remote)", 2)];
        let merged = apply_operations(
            base,
            &[entry(
                1,
                10,
                OperationPayload::Add {
                    book: book("b1", "Dune (reimported)", 3),
                },
            )],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "Dune (reimported)");
    }

    #[test]
    fn test_delete_always_wins() {
        let base = vec![book("b1", "Dune", 9), book("b2", "Hyperion", 1)];
        let merged = apply_operations(
            base,
            &[entry(
                1,
                10,
                OperationPayload::Delete {
                    id: "b1".parse().unwrap(),
                    title: "Dune".to_string(),
                },
            )],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id.as_str(), "b2");
    }

    #[test]
    fn test_delete_of_absent_record_is_a_no_op() {
        let base = vec![book("b1", "Dune", 1)];
        let merged = apply_operations(
            base.clone(),
            &[entry(
                1,
                10,
                OperationPayload::Delete {
                    id: "ghost".parse().unwrap(),
                    title: "Ghost".to_string(),
                },
            )],
        );
        assert_eq!(merged, base);
    }

    #[test]
    fn test_later_add_resurrects_a_deleted_id() {
        let base = vec![book("b1", "Dune", 2)];
        let merged = apply_operations(
            base,
            &[
                entry(
                    1,
                    10,
                    OperationPayload::Delete {
                        id: "b1".parse().unwrap(),
                        title: "Dune".to_string(),
                    },
                ),
                entry(
                    2,
                    20,
                    OperationPayload::Add {
                        book: book("b1", "Dune (restored)", 3),
                    },
                ),
            ],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "Dune (restored)");
    }

    #[test]
    fn test_applying_a_delta_twice_equals_applying_it_once() {
        let base = vec![book("b1", "Dune", 1), book("b2", "Hyperion", 2)];
        let delta = [
            entry(
                1,
                10,
                OperationPayload::Update {
                    book: book("b1", "Dune (edited)", 2),
                    previous_version: 1,
                },
            ),
            entry(
                2,
                20,
                OperationPayload::Add {
                    book: book("b3", "Ubik", 1),
                },
            ),
            entry(
                3,
                30,
                OperationPayload::Delete {
                    id: "b2".parse().unwrap(),
                    title: "Hyperion".to_string(),
                },
            ),
        ];

        let once = apply_operations(base, &delta);
        let twice = apply_operations(once.clone(), &delta);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_replaying_entries_in_log_order_reaches_final_state() {
        let delta = [
            entry(
                1,
                10,
                OperationPayload::Add {
                    book: book("b1", "Dune", 1),
                },
            ),
            entry(
                2,
                20,
                OperationPayload::Update {
                    book: book("b1", "Dune Messiah", 2),
                    previous_version: 1,
                },
            ),
            entry(
                3,
                30,
                OperationPayload::Update {
                    book: book("b1", "Children of Dune", 3),
                    previous_version: 2,
                },
            ),
        ];

        let merged = apply_operations(Vec::new(), &delta);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "Children of Dune");
        assert_eq!(merged[0].version, 3);
    }
}
