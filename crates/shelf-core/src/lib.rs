//! shelf-core - Core library for Shelf
//!
//! This crate contains the shared models, the embedded catalog store, the
//! remote document client, and the synchronization engine used by all Shelf
//! interfaces.

pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod remote;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Book, BookDraft, BookId};
