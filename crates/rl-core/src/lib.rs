//! rl Core Library
//!
//! This crate provides the persistent link store behind `rl`, a local
//! read-later tool: saved URLs with a title, a note, tags and a read state.
//!
//! # Architecture
//!
//! - **SQLite**: single source of truth, one `links` table
//! - **FTS5**: search index kept in lockstep with `links` by the store itself
//! - **Migrations**: forward-only steps recorded in a `schema_migrations` ledger
//!
//! # Quick Start
//!
//! ```text
//! let mut store = LinkStore::open(&Config::load()?)?;
//!
//! // Add (or merge into) a link
//! let outcome = store.add(&LinkDraft::new("https://example.com").title("Example"))?;
//!
//! // Query links
//! let unread = store.list(&ListOptions::default())?;
//! ```
//!
//! # Modules
//!
//! - `store`: the link store (main entry point)
//! - `models`: links, tag sets and list options
//! - `merge`: the Add and Import merge policies
//! - `identity`: short id generation and validation
//! - `storage`: migrations, row access, search index and errors
//! - `timestamp`: parsing, canonical formatting and display of timestamps
//! - `transfer`: JSON export/import wire format
//! - `config`: application configuration

pub mod config;
pub mod identity;
pub mod merge;
pub mod models;
pub mod storage;
pub mod store;
pub mod timestamp;
pub mod transfer;

pub use config::Config;
pub use models::{AddOutcome, ImportReport, Link, LinkDraft, ListOptions, ReadStatus, TagSet};
pub use storage::{ErrorKind, StoreError, StoreResult};
pub use store::LinkStore;
pub use timestamp::DisplayZone;
