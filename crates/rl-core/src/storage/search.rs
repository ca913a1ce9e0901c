//! Full-text search over links
//!
//! `links_fts` is an FTS5 table keyed by the link id. No triggers keep it
//! in sync; callers write the index inside the same transaction as the
//! `links` row so the two never drift.

use rusqlite::{params, Connection};

use crate::models::Link;
use crate::storage::links::{query_links, LINK_COLUMNS, NEWEST_FIRST};
use crate::storage::{StoreError, StoreResult};

/// Replace the index entry for `link`
pub fn index_link(conn: &Connection, link: &Link) -> StoreResult<()> {
    unindex(conn, &link.id)?;
    conn.execute(
        "INSERT INTO links_fts (id, url, title, note, tags) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![link.id, link.url, link.title, link.note, link.tags.to_string()],
    )?;
    Ok(())
}

/// Remove the index entry for `id`, if any
pub fn unindex(conn: &Connection, id: &str) -> StoreResult<()> {
    conn.execute("DELETE FROM links_fts WHERE id = ?1", params![id])?;
    Ok(())
}

/// Repopulate the index from `links`
pub fn rebuild(conn: &Connection) -> StoreResult<usize> {
    conn.execute("DELETE FROM links_fts", [])?;
    let indexed = conn.execute(
        r#"
        INSERT INTO links_fts (id, url, title, note, tags)
        SELECT id, url, COALESCE(title, ''), COALESCE(note, ''), COALESCE(tags, '')
        FROM links
        "#,
        [],
    )?;
    Ok(indexed)
}

/// Links matching an FTS5 query, newest first
///
/// Terms are ANDed; quoted phrases, `OR`, `NOT` and prefix `*` follow the
/// FTS5 query grammar.
pub fn search(conn: &Connection, query: &str) -> StoreResult<Vec<Link>> {
    if query.trim().is_empty() {
        return Err(StoreError::InvalidQuery {
            reason: "query is empty".to_string(),
        });
    }

    let sql = format!(
        r#"
        SELECT {}
        FROM links
        WHERE id IN (SELECT id FROM links_fts WHERE links_fts MATCH ?1)
        {}
        "#,
        LINK_COLUMNS, NEWEST_FIRST
    );

    // Grammar errors surface while stepping, not at prepare time
    query_links(conn, &sql, params![query]).map_err(|source| StoreError::Search {
        query: query.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagSet;
    use crate::storage::{links, migrate, ErrorKind};

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn
    }

    fn save(conn: &Connection, id: &str, url: &str, title: &str, tags: &str) -> Link {
        save_at(conn, id, url, title, tags, "2024-01-01")
    }

    fn save_at(
        conn: &Connection,
        id: &str,
        url: &str,
        title: &str,
        tags: &str,
        created: &str,
    ) -> Link {
        let mut link = Link::new(url);
        link.id = id.to_string();
        link.title = title.to_string();
        link.tags = TagSet::parse(tags);
        link.created_at = crate::timestamp::parse(created);
        links::insert(conn, &link).unwrap();
        index_link(conn, &link).unwrap();
        link
    }

    fn ids(results: &[Link]) -> Vec<&str> {
        results.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_matches_title_and_tags() {
        let conn = conn();
        save(&conn, "aaaaaaaaaa", "https://a.test", "Rust book", "lang");
        save(&conn, "bbbbbbbbbb", "https://b.test", "Go tour", "lang,rust");
        save(&conn, "cccccccccc", "https://c.test", "Cooking", "food");

        let results = search(&conn, "rust").unwrap();
        assert_eq!(results.len(), 2);
        assert!(ids(&results).contains(&"aaaaaaaaaa"));
        assert!(ids(&results).contains(&"bbbbbbbbbb"));

        // terms are ANDed
        assert_eq!(ids(&search(&conn, "rust book").unwrap()), vec!["aaaaaaaaaa"]);
        assert!(search(&conn, "nothing").unwrap().is_empty());
    }

    #[test]
    fn test_results_newest_first() {
        let conn = conn();
        // inserted out of date order so rowid cannot explain the result
        save_at(&conn, "bbbbbbbbbb", "https://b.test", "Rust middle", "", "2024-02-01");
        save_at(&conn, "cccccccccc", "https://c.test", "Rust newest", "", "2024-03-01");
        save_at(&conn, "aaaaaaaaaa", "https://a.test", "Rust oldest", "", "2024-01-01");
        save_at(&conn, "dddddddddd", "https://d.test", "Other", "", "2024-04-01");

        assert_eq!(
            ids(&search(&conn, "rust").unwrap()),
            vec!["cccccccccc", "bbbbbbbbbb", "aaaaaaaaaa"]
        );
    }

    #[test]
    fn test_reindex_replaces_entry() {
        let conn = conn();
        let mut link = save(&conn, "aaaaaaaaaa", "https://a.test", "Before", "");

        link.title = "After".to_string();
        links::update(&conn, &link).unwrap();
        index_link(&conn, &link).unwrap();

        assert!(search(&conn, "before").unwrap().is_empty());
        assert_eq!(ids(&search(&conn, "after").unwrap()), vec!["aaaaaaaaaa"]);

        let entries: i64 = conn
            .query_row("SELECT COUNT(*) FROM links_fts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_unindex() {
        let conn = conn();
        save(&conn, "aaaaaaaaaa", "https://a.test", "Gone", "");
        unindex(&conn, "aaaaaaaaaa").unwrap();
        assert!(search(&conn, "gone").unwrap().is_empty());
    }

    #[test]
    fn test_rebuild_from_table() {
        let conn = conn();
        conn.execute(
            "INSERT INTO links (id, url, title, created_at) VALUES ('aaaaaaaaaa', 'https://a.test', 'Orphan', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        assert!(search(&conn, "orphan").unwrap().is_empty());

        assert_eq!(rebuild(&conn).unwrap(), 1);
        assert_eq!(ids(&search(&conn, "orphan").unwrap()), vec!["aaaaaaaaaa"]);
    }

    #[test]
    fn test_blank_query_is_invalid() {
        let conn = conn();
        let err = search(&conn, "   ").unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_bad_syntax_is_index_failure() {
        let conn = conn();
        save(&conn, "aaaaaaaaaa", "https://a.test", "Something", "");
        let err = search(&conn, "\"unterminated").unwrap_err();
        assert!(matches!(err, StoreError::Search { .. }));
        assert_eq!(err.kind(), ErrorKind::IndexFailure);
    }
}
