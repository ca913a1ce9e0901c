//! The link store
//!
//! `LinkStore` owns one SQLite connection and is the only way the rest of
//! the program touches saved links. Opening it brings the schema up to
//! date; every write afterwards runs in an IMMEDIATE transaction that
//! covers both the `links` row and its search index entry.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = LinkStore::open(&Config::load()?)?;
//!
//! let outcome = store.add(&LinkDraft::new("https://example.com").tags("rust"))?;
//! store.mark_read(&outcome.link.id)?;
//!
//! for link in store.search("rust")? {
//!     println!("{}", link.url);
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::identity::{is_valid_id, new_id};
use crate::merge::{merge_for_add, merge_for_import};
use crate::models::{
    validate_url, AddOutcome, ImportReport, Link, LinkDraft, ListOptions, SkippedRecord,
};
use crate::storage::{links, migrations, search, StoreError, StoreResult};
use crate::{timestamp, transfer};

/// Path that opens a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Persistent store of saved links
pub struct LinkStore {
    conn: Connection,
}

impl LinkStore {
    /// Open the database named by the configuration
    pub fn open(config: &Config) -> StoreResult<Self> {
        Self::open_path(
            config.database_path(),
            Duration::from_millis(config.busy_timeout_ms),
        )
    }

    /// Open or create a database file, creating its directory if needed
    ///
    /// File databases use WAL journaling. `busy_timeout` bounds how long a
    /// write waits for another process holding the lock.
    pub fn open_path(path: impl AsRef<Path>, busy_timeout: Duration) -> StoreResult<Self> {
        let path = path.as_ref();
        if path.as_os_str() == IN_MEMORY {
            return Self::open_in_memory();
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::from_io(e, parent.to_path_buf()))?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            warn!("Database {:?} stayed in {} journal mode", path, mode);
        }
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Opened database at {:?}", path);
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> StoreResult<Self> {
        migrations::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ==================== Writes ====================

    /// Save a URL, merging into the stored link when the URL is known
    ///
    /// Non-empty title and note replace stored values; tags are unioned.
    /// Id, creation time and read state of a known URL never change here.
    pub fn add(&mut self, draft: &LinkDraft) -> StoreResult<AddOutcome> {
        validate_url(&draft.url)?;

        self.write(|tx| match links::find_by_url(tx, &draft.url)? {
            Some(existing) => {
                let link = merge_for_add(&existing, draft);
                links::update(tx, &link)?;
                search::index_link(tx, &link)?;
                debug!("Merged into link {} ({})", link.id, link.url);
                Ok(AddOutcome {
                    link,
                    created: false,
                })
            }
            None => {
                let link = Link {
                    id: new_id(),
                    url: draft.url.clone(),
                    title: draft.title.clone(),
                    note: draft.note.clone(),
                    tags: draft.tags.clone(),
                    created_at: Some(timestamp::now()),
                    read_at: None,
                };
                links::insert(tx, &link)?;
                search::index_link(tx, &link)?;
                debug!("Created link {} ({})", link.id, link.url);
                Ok(AddOutcome {
                    link,
                    created: true,
                })
            }
        })
    }

    /// Permanently remove a link and its index entry
    pub fn delete(&mut self, id: &str) -> StoreResult<()> {
        check_id(id)?;

        self.write(|tx| {
            if links::delete(tx, id)? == 0 {
                return Err(not_found(id));
            }
            search::unindex(tx, id)?;
            debug!("Deleted link {}", id);
            Ok(())
        })
    }

    /// Delete each id independently, reporting every outcome
    pub fn delete_many(&mut self, ids: &[String]) -> Vec<(String, StoreResult<()>)> {
        ids.iter()
            .map(|id| (id.clone(), self.delete(id)))
            .collect()
    }

    /// Stamp the link as read now; repeating re-stamps it
    pub fn mark_read(&mut self, id: &str) -> StoreResult<()> {
        let now = timestamp::format(&timestamp::now());
        self.set_read_at(id, Some(&now))
    }

    /// Clear the read stamp
    pub fn mark_unread(&mut self, id: &str) -> StoreResult<()> {
        self.set_read_at(id, None)
    }

    fn set_read_at(&mut self, id: &str, read_at: Option<&str>) -> StoreResult<()> {
        check_id(id)?;

        self.write(|tx| {
            if links::set_read_at(tx, id, read_at)? == 0 {
                return Err(not_found(id));
            }
            Ok(())
        })
    }

    /// Merge exported records into the store
    ///
    /// Stored text wins over incoming text, tags are unioned, and the
    /// incoming read state replaces the stored one. Records with an
    /// invalid URL or id are skipped and listed in the report. Each record
    /// commits on its own; a storage failure stops the import and leaves
    /// earlier records in place.
    pub fn import(&mut self, records: Vec<Link>) -> StoreResult<ImportReport> {
        let mut report = ImportReport::default();

        for record in records {
            if let Some(reason) = rejection(&record) {
                warn!("Skipping import record {}: {}", record.url, reason);
                report.skipped.push(SkippedRecord {
                    url: record.url,
                    reason,
                });
                continue;
            }

            let url = record.url.clone();
            let created = self
                .write(|tx| import_record(tx, record))
                .map_err(|source| StoreError::ImportAborted {
                    url,
                    completed: report.imported(),
                    source: Box::new(source),
                })?;

            if created {
                report.created += 1;
            } else {
                report.merged += 1;
            }
        }

        info!(
            "Imported {} link(s): {} new, {} merged, {} skipped",
            report.imported(),
            report.created,
            report.merged,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Decode a JSON export and import it
    pub fn import_json(&mut self, json: &str) -> StoreResult<ImportReport> {
        let records = transfer::decode(json)?;
        self.import(records)
    }

    /// Repopulate the search index from the stored links
    pub fn rebuild_search_index(&mut self) -> StoreResult<usize> {
        let indexed = self.write(|tx| search::rebuild(tx))?;
        info!("Rebuilt search index with {} link(s)", indexed);
        Ok(indexed)
    }

    /// Run `f` inside an IMMEDIATE transaction, committing on success
    fn write<T>(&mut self, f: impl FnOnce(&Transaction<'_>) -> StoreResult<T>) -> StoreResult<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ==================== Reads ====================

    /// Get a link by id
    pub fn get(&self, id: &str) -> StoreResult<Link> {
        check_id(id)?;
        links::find_by_id(&self.conn, id)?.ok_or_else(|| not_found(id))
    }

    /// Get the link saved for `url`, if any
    pub fn find_by_url(&self, url: &str) -> StoreResult<Option<Link>> {
        links::find_by_url(&self.conn, url)
    }

    /// Links matching the filters, newest first
    pub fn list(&self, opts: &ListOptions) -> StoreResult<Vec<Link>> {
        links::list(&self.conn, opts)
    }

    /// Every link, newest first
    pub fn export(&self) -> StoreResult<Vec<Link>> {
        self.list(&ListOptions::all())
    }

    /// Every link as the JSON export document
    pub fn export_json(&self) -> StoreResult<String> {
        transfer::encode(&self.export()?)
    }

    /// Full-text search, newest first
    pub fn search(&self, query: &str) -> StoreResult<Vec<Link>> {
        search::search(&self.conn, query)
    }

    /// Number of stored links
    pub fn count(&self) -> StoreResult<usize> {
        links::count(&self.conn)
    }
}

/// Insert or merge one record; returns `true` when a new link was created
fn import_record(tx: &Transaction<'_>, record: Link) -> StoreResult<bool> {
    match links::find_by_url(tx, &record.url)? {
        Some(existing) => {
            let link = merge_for_import(&existing, &record);
            links::update(tx, &link)?;
            search::index_link(tx, &link)?;
            debug!("Merged import into link {} ({})", link.id, link.url);
            Ok(false)
        }
        None => {
            let link = Link {
                id: if record.id.is_empty() {
                    new_id()
                } else {
                    record.id
                },
                created_at: record.created_at.or_else(|| Some(timestamp::now())),
                ..record
            };
            links::insert(tx, &link)?;
            search::index_link(tx, &link)?;
            debug!("Imported link {} ({})", link.id, link.url);
            Ok(true)
        }
    }
}

/// Why an import record cannot be written, if it cannot
fn rejection(record: &Link) -> Option<String> {
    if let Err(e) = validate_url(&record.url) {
        return Some(e.to_string());
    }
    if !record.id.is_empty() && !is_valid_id(&record.id) {
        return Some(
            StoreError::InvalidId {
                id: record.id.clone(),
            }
            .to_string(),
        );
    }
    None
}

fn check_id(id: &str) -> StoreResult<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(StoreError::InvalidId { id: id.to_string() })
    }
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound { id: id.to_string() }
}
