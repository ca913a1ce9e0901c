//! Storage layer
//!
//! SQLite access for the link store.
//!
//! ## Tables
//!
//! - `links` - One row per URL, keyed by short id
//! - `links_fts` - FTS5 index over url, title, note and tags, keyed by id
//! - `schema_migrations` - Ledger of applied schema versions
//!
//! Nothing here opens transactions on its own except the migrator. Row and
//! index helpers take a `&Connection` so the store can run them inside the
//! transaction that covers the whole write.

pub mod error;
pub(crate) mod links;
pub mod migrations;
pub mod search;

pub use error::{ErrorKind, StoreError, StoreResult};
pub use migrations::{migrate, Migration, MIGRATIONS};
