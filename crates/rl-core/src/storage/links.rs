//! Row access for the `links` table

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Link, ListOptions, ReadStatus, TagSet};
use crate::storage::StoreResult;
use crate::timestamp;

/// Column list matching [`LinkRow::from_row`]
pub(crate) const LINK_COLUMNS: &str = "id, url, title, note, tags, created_at, read_at";

/// Newest first; ties go to the most recently inserted row
///
/// Rows whose `created_at` is empty or legacy free text sort after every
/// canonical timestamp.
pub(crate) const NEWEST_FIRST: &str = "ORDER BY \
    created_at GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]T*' DESC, \
    created_at DESC, \
    rowid DESC";

/// Raw column values before timestamp and tag parsing
pub(crate) struct LinkRow {
    id: String,
    url: String,
    title: Option<String>,
    note: Option<String>,
    tags: Option<String>,
    created_at: Option<String>,
    read_at: Option<String>,
}

impl LinkRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(LinkRow {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            note: row.get(3)?,
            tags: row.get(4)?,
            created_at: row.get(5)?,
            read_at: row.get(6)?,
        })
    }

    /// Unparsable timestamps read back as `None`
    pub(crate) fn into_link(self) -> Link {
        Link {
            id: self.id,
            url: self.url,
            title: self.title.unwrap_or_default(),
            note: self.note.unwrap_or_default(),
            tags: self.tags.as_deref().map(TagSet::parse).unwrap_or_default(),
            created_at: self.created_at.as_deref().and_then(timestamp::parse),
            read_at: self.read_at.as_deref().and_then(timestamp::parse),
        }
    }
}

/// Run a link query and hydrate every row
pub(crate) fn query_links<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<Vec<Link>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, LinkRow::from_row)?;

    let mut links = Vec::new();
    for row in rows {
        links.push(row?.into_link());
    }
    Ok(links)
}

pub(crate) fn find_by_id(conn: &Connection, id: &str) -> StoreResult<Option<Link>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM links WHERE id = ?1", LINK_COLUMNS),
            params![id],
            LinkRow::from_row,
        )
        .optional()?;
    Ok(row.map(LinkRow::into_link))
}

pub(crate) fn find_by_url(conn: &Connection, url: &str) -> StoreResult<Option<Link>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM links WHERE url = ?1", LINK_COLUMNS),
            params![url],
            LinkRow::from_row,
        )
        .optional()?;
    Ok(row.map(LinkRow::into_link))
}

pub(crate) fn insert(conn: &Connection, link: &Link) -> StoreResult<()> {
    conn.execute(
        r#"
        INSERT INTO links (id, url, title, note, tags, created_at, read_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            link.id,
            link.url,
            link.title,
            link.note,
            link.tags.to_string(),
            created_at_text(link),
            link.read_at.as_ref().map(timestamp::format),
        ],
    )?;
    Ok(())
}

/// Overwrite the mutable columns of the row with `link.id`
///
/// A missing `created_at` leaves the stored text alone, so legacy values
/// that do not parse survive a merge.
pub(crate) fn update(conn: &Connection, link: &Link) -> StoreResult<()> {
    conn.execute(
        r#"
        UPDATE links
        SET url = ?2, title = ?3, note = ?4, tags = ?5,
            created_at = COALESCE(?6, created_at), read_at = ?7
        WHERE id = ?1
        "#,
        params![
            link.id,
            link.url,
            link.title,
            link.note,
            link.tags.to_string(),
            link.created_at.as_ref().map(timestamp::format),
            link.read_at.as_ref().map(timestamp::format),
        ],
    )?;
    Ok(())
}

/// Returns the number of rows removed
pub(crate) fn delete(conn: &Connection, id: &str) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM links WHERE id = ?1", params![id])?)
}

/// Returns the number of rows changed
pub(crate) fn set_read_at(conn: &Connection, id: &str, read_at: Option<&str>) -> StoreResult<usize> {
    Ok(conn.execute(
        "UPDATE links SET read_at = ?2 WHERE id = ?1",
        params![id, read_at],
    )?)
}

pub(crate) fn count(conn: &Connection) -> StoreResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Links matching `opts`, in [`NEWEST_FIRST`] order
pub(crate) fn list(conn: &Connection, opts: &ListOptions) -> StoreResult<Vec<Link>> {
    let status = match opts.read_status {
        ReadStatus::Unread => "read_at IS NULL",
        ReadStatus::Read => "read_at IS NOT NULL",
        ReadStatus::All => "1 = 1",
    };
    let sql = format!(
        r#"
        SELECT {}
        FROM links
        WHERE {}
          AND (?1 IS NULL OR instr(lower(COALESCE(tags, '')), lower(?1)) > 0)
        {}
        LIMIT ?2
        "#,
        LINK_COLUMNS, status, NEWEST_FIRST
    );

    let tag = opts.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());
    // SQLite treats a negative limit as unbounded
    let limit = match opts.limit {
        Some(n) if n > 0 => n as i64,
        _ => -1,
    };

    Ok(query_links(conn, &sql, params![tag, limit])?)
}

/// `created_at` is NOT NULL; a missing timestamp is stored as empty text
fn created_at_text(link: &Link) -> String {
    link.created_at
        .as_ref()
        .map(timestamp::format)
        .unwrap_or_default()
}
