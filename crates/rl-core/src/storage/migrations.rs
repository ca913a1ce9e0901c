//! Schema migrations
//!
//! Each step is named `NNNN_description`; the numeric prefix is its version.
//! Applied versions are recorded in `schema_migrations`. A step and its
//! ledger row commit in one transaction, so a version is either fully
//! applied and recorded or not touched at all. There are no down steps.
//!
//! Steps must work on a fresh database and on one left behind by older
//! releases. Those used integer primary keys and a rowid-keyed FTS table
//! maintained by triggers. SQLite cannot change a column's type in place,
//! so steps that rewrite rows build a replacement table and swap it in.

use std::collections::BTreeSet;
use std::fmt;

use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::storage::{StoreError, StoreResult};
use crate::timestamp;

/// Runs inside the step's transaction, before its statements
pub type PrepareFn = fn(&Connection) -> rusqlite::Result<()>;

/// A forward-only schema change
#[derive(Clone, Copy)]
pub struct Migration {
    /// `NNNN_description`
    pub name: &'static str,
    /// Statements executed as one batch
    pub sql: &'static str,
    /// Schema-dependent work plain SQL cannot express
    pub prepare: Option<PrepareFn>,
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .field("prepare", &self.prepare.is_some())
            .finish()
    }
}

impl Migration {
    /// Version parsed from the name prefix
    pub fn version(&self) -> Option<i64> {
        self.name.split('_').next()?.parse().ok()
    }
}

/// Migrations shipped with this release, in any order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "0001_create_links",
        sql: r#"
        CREATE TABLE IF NOT EXISTS links (
            id TEXT PRIMARY KEY,
            url TEXT UNIQUE NOT NULL,
            title TEXT,
            note TEXT,
            tags TEXT,
            created_at TEXT NOT NULL,
            read_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_links_read_at ON links(read_at);
        CREATE INDEX IF NOT EXISTS idx_links_created_at ON links(created_at);
        "#,
        prepare: None,
    },
    Migration {
        name: "0002_text_ids",
        sql: r#"
        CREATE TABLE links_rebuilt (
            id TEXT PRIMARY KEY,
            url TEXT UNIQUE NOT NULL,
            title TEXT,
            note TEXT,
            tags TEXT,
            created_at TEXT NOT NULL,
            read_at TEXT
        );

        -- Integer and malformed ids get a legacy 12-char hex id.
        -- Unparsable created_at text is kept as is.
        INSERT INTO links_rebuilt (id, url, title, note, tags, created_at, read_at)
        SELECT
            CASE
                WHEN typeof(id) = 'text'
                    AND length(id) BETWEEN 10 AND 30
                    AND id NOT GLOB '*[^A-Za-z0-9]*'
                THEN id
                ELSE lower(hex(randomblob(6)))
            END,
            url,
            title,
            note,
            tags,
            COALESCE(strftime('%Y-%m-%dT%H:%M:%SZ', created_at), created_at, ''),
            strftime('%Y-%m-%dT%H:%M:%SZ', NULLIF(read_at, ''))
        FROM links;

        DROP TABLE links;
        ALTER TABLE links_rebuilt RENAME TO links;

        CREATE INDEX idx_links_read_at ON links(read_at);
        CREATE INDEX idx_links_created_at ON links(created_at);
        "#,
        prepare: None,
    },
    Migration {
        name: "0003_search_index",
        sql: r#"
        DROP TABLE IF EXISTS links_fts;

        -- Keyed by the logical id; the store maintains it in the same
        -- transaction as every write to links.
        CREATE VIRTUAL TABLE links_fts USING fts5(
            id UNINDEXED,
            url,
            title,
            note,
            tags
        );

        INSERT INTO links_fts (id, url, title, note, tags)
        SELECT id, url, COALESCE(title, ''), COALESCE(note, ''), COALESCE(tags, '')
        FROM links;
        "#,
        prepare: Some(drop_link_triggers),
    },
];

/// Drop every trigger on `links`, whatever an older release named it
fn drop_link_triggers(conn: &Connection) -> rusqlite::Result<()> {
    let names: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'trigger' AND tbl_name = 'links'",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<_, _>>()?
    };

    for name in names {
        debug!("Dropping legacy trigger {}", name);
        conn.execute_batch(&format!(
            "DROP TRIGGER IF EXISTS \"{}\";",
            name.replace('"', "\"\"")
        ))?;
    }
    Ok(())
}

/// Highest version shipped with this release
pub fn latest_version() -> i64 {
    MIGRATIONS
        .iter()
        .filter_map(Migration::version)
        .max()
        .unwrap_or(0)
}

/// Apply all pending shipped migrations
///
/// Returns the versions applied by this call, ascending. An up-to-date
/// database returns an empty list and is left untouched.
pub fn migrate(conn: &mut Connection) -> StoreResult<Vec<i64>> {
    migrate_with(conn, MIGRATIONS)
}

/// Apply all pending migrations from `migrations`
pub fn migrate_with(conn: &mut Connection, migrations: &[Migration]) -> StoreResult<Vec<i64>> {
    let plan = plan(migrations)?;

    ensure_ledger(conn)?;
    let applied = applied_versions(conn)?;

    let mut newly_applied = Vec::new();
    for (version, migration) in plan {
        if applied.contains(&version) {
            continue;
        }
        apply(conn, version, migration)?;
        newly_applied.push(version);
    }

    if newly_applied.is_empty() {
        debug!("Schema is up to date");
    }

    Ok(newly_applied)
}

/// Versions recorded in the ledger
pub fn applied_versions(conn: &Connection) -> StoreResult<BTreeSet<i64>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<BTreeSet<i64>, _>>()?;
    Ok(versions)
}

/// Create the ledger table if needed
fn ensure_ledger(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Sort by version, skipping unversioned names and rejecting duplicates
fn plan(migrations: &[Migration]) -> StoreResult<Vec<(i64, &Migration)>> {
    let mut plan: Vec<(i64, &Migration)> = Vec::with_capacity(migrations.len());
    for migration in migrations {
        match migration.version() {
            Some(version) => plan.push((version, migration)),
            None => warn!("Skipping migration without a version prefix: {}", migration.name),
        }
    }
    plan.sort_by_key(|(version, _)| *version);

    for pair in plan.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(StoreError::DuplicateMigration {
                version: pair[0].0,
                first: pair[0].1.name.to_string(),
                second: pair[1].1.name.to_string(),
            });
        }
    }

    Ok(plan)
}

/// Run one step and record it, atomically
fn apply(conn: &mut Connection, version: i64, migration: &Migration) -> StoreResult<()> {
    let failed = |source: rusqlite::Error| StoreError::Migration {
        version,
        name: migration.name.to_string(),
        source,
    };

    // Dropping the transaction on any early return rolls it back
    let tx = conn.transaction().map_err(failed)?;
    if let Some(prepare) = migration.prepare {
        prepare(&tx).map_err(failed)?;
    }
    tx.execute_batch(migration.sql).map_err(failed)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        params![version, timestamp::format(&timestamp::now())],
    )
    .map_err(failed)?;
    tx.commit().map_err(failed)?;

    info!("Applied migration {}", migration.name);
    Ok(())
}
