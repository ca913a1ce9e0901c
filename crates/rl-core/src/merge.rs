//! Merge policies for saving a URL that is already stored
//!
//! The two entry points differ in which side wins:
//!
//! - [`merge_for_add`]: the user just typed the values, so non-empty new
//!   text replaces what was stored.
//! - [`merge_for_import`]: the local store is authoritative for text, so
//!   incoming values only fill gaps.
//!
//! Both keep the stored id and union tags with the stored tags first.

use crate::models::{Link, LinkDraft};
use crate::timestamp;

/// Combine a stored link with a draft from `add`
pub fn merge_for_add(existing: &Link, draft: &LinkDraft) -> Link {
    Link {
        id: existing.id.clone(),
        url: existing.url.clone(),
        title: prefer_non_empty(&draft.title, &existing.title),
        note: prefer_non_empty(&draft.note, &existing.note),
        tags: existing.tags.union(&draft.tags),
        created_at: existing.created_at,
        read_at: existing.read_at,
    }
}

/// Combine a stored link with an incoming import record
pub fn merge_for_import(existing: &Link, incoming: &Link) -> Link {
    Link {
        id: existing.id.clone(),
        url: existing.url.clone(),
        title: prefer_non_empty(&existing.title, &incoming.title),
        note: prefer_non_empty(&existing.note, &incoming.note),
        tags: existing.tags.union(&incoming.tags),
        created_at: existing
            .created_at
            .or(incoming.created_at)
            .or_else(|| Some(timestamp::now())),
        read_at: import_read_state(existing, incoming),
    }
}

/// Read state after importing `incoming` over `existing`
///
/// The incoming value always wins, including `None`: importing an export
/// taken before a link was read marks it unread again.
pub fn import_read_state(
    _existing: &Link,
    incoming: &Link,
) -> Option<chrono::DateTime<chrono::Utc>> {
    incoming.read_at
}

fn prefer_non_empty(preferred: &str, fallback: &str) -> String {
    if preferred.is_empty() {
        fallback.to_string()
    } else {
        preferred.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagSet;

    fn stored() -> Link {
        Link {
            id: "storedid0001".into(),
            url: "https://a.test".into(),
            title: "Stored".into(),
            note: String::new(),
            tags: TagSet::parse("x,y"),
            created_at: timestamp::parse("2024-01-01T00:00:00Z"),
            read_at: timestamp::parse("2024-01-05T00:00:00Z"),
        }
    }

    #[test]
    fn test_add_new_text_wins() {
        let draft = LinkDraft::new("https://a.test")
            .title("Fresh")
            .note("first note")
            .tags("Y,z");
        let merged = merge_for_add(&stored(), &draft);

        assert_eq!(merged.id, "storedid0001");
        assert_eq!(merged.title, "Fresh");
        assert_eq!(merged.note, "first note");
        assert_eq!(merged.tags.to_string(), "x,y,z");
        assert_eq!(merged.created_at, stored().created_at);
        assert_eq!(merged.read_at, stored().read_at);
    }

    #[test]
    fn test_add_empty_text_keeps_stored() {
        let merged = merge_for_add(&stored(), &LinkDraft::new("https://a.test"));
        assert_eq!(merged.title, "Stored");
        assert_eq!(merged.tags.to_string(), "x,y");
    }

    #[test]
    fn test_import_stored_text_wins() {
        let mut incoming = Link::new("https://a.test");
        incoming.id = "otherid00001".into();
        incoming.title = "Incoming".into();
        incoming.note = "fills the gap".into();
        incoming.tags = TagSet::parse("z");
        incoming.created_at = timestamp::parse("2020-01-01");

        let merged = merge_for_import(&stored(), &incoming);

        assert_eq!(merged.id, "storedid0001");
        assert_eq!(merged.title, "Stored");
        assert_eq!(merged.note, "fills the gap");
        assert_eq!(merged.tags.to_string(), "x,y,z");
        assert_eq!(merged.created_at, stored().created_at);
    }

    #[test]
    fn test_import_fills_missing_created_at() {
        let mut existing = stored();
        existing.created_at = None;

        let mut incoming = Link::new("https://a.test");
        incoming.created_at = timestamp::parse("2020-01-01");
        assert_eq!(
            merge_for_import(&existing, &incoming).created_at,
            incoming.created_at
        );

        incoming.created_at = None;
        assert!(merge_for_import(&existing, &incoming).created_at.is_some());
    }

    #[test]
    fn test_import_read_state_follows_incoming() {
        let existing = stored();
        let mut incoming = Link::new("https://a.test");

        // surprising but intended: an unread record clears the stored read time
        assert_eq!(import_read_state(&existing, &incoming), None);

        incoming.read_at = timestamp::parse("2024-02-01");
        assert_eq!(import_read_state(&existing, &incoming), incoming.read_at);
    }
}
