//! Data models for rl
//!
//! Defines the core data structures: `Link`, its `TagSet`, and the inputs
//! and outputs of the store operations. `Link` doubles as the JSON export
//! record (see `transfer`).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::storage::{StoreError, StoreResult};
use crate::timestamp;

/// A saved link with metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    /// Short id; empty on import records that did not carry one
    #[serde(default)]
    pub id: String,
    /// The URL, unique across the store
    pub url: String,
    /// Display title
    #[serde(
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub title: String,
    /// Free-form note
    #[serde(
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub note: String,
    /// Tags for organization
    #[serde(default, skip_serializing_if = "TagSet::is_empty")]
    pub tags: TagSet,
    /// When the URL was first saved; `None` only for unparsable legacy rows
    #[serde(default, with = "timestamp::serde_opt")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the link was marked read; `None` while unread
    #[serde(
        default,
        with = "timestamp::serde_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub read_at: Option<DateTime<Utc>>,
}

impl Link {
    /// Create an unsaved link with the given URL and no metadata
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            url: url.into(),
            title: String::new(),
            note: String::new(),
            tags: TagSet::default(),
            created_at: None,
            read_at: None,
        }
    }

    /// Whether the link has been marked read
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Check that `url` is absolute with a non-empty scheme and host
pub fn validate_url(url: &str) -> StoreResult<()> {
    let invalid = || StoreError::InvalidUrl {
        url: url.to_string(),
    };
    let parsed = url::Url::parse(url).map_err(|_| invalid())?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() && !parsed.scheme().is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}

/// Input to `LinkStore::add`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkDraft {
    pub url: String,
    pub title: String,
    pub note: String,
    pub tags: TagSet,
}

impl LinkDraft {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Tags as the comma separated text users type
    pub fn tags(mut self, tags: &str) -> Self {
        self.tags = TagSet::parse(tags);
        self
    }
}

/// Result of `LinkStore::add`
#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    /// The stored link after merging
    pub link: Link,
    /// `true` when the URL was new, `false` when an existing link was updated
    pub created: bool,
}

/// Which links `LinkStore::list` returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadStatus {
    #[default]
    Unread,
    Read,
    All,
}

/// Filters for `LinkStore::list`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub read_status: ReadStatus,
    /// Case-insensitive substring of the stored tag text
    pub tag: Option<String>,
    /// Maximum number of results; `None` or zero means no limit
    pub limit: Option<usize>,
}

impl ListOptions {
    /// Every link, newest first
    pub fn all() -> Self {
        Self {
            read_status: ReadStatus::All,
            ..Self::default()
        }
    }
}

/// Summary of `LinkStore::import`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Records inserted as new links
    pub created: usize,
    /// Records merged into an existing link with the same URL
    pub merged: usize,
    /// Records rejected by validation
    pub skipped: Vec<SkippedRecord>,
}

impl ImportReport {
    /// Records written to the store
    pub fn imported(&self) -> usize {
        self.created + self.merged
    }
}

/// An import record that failed validation and was not written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub url: String,
    pub reason: String,
}

/// An ordered set of tags with case-insensitive membership
///
/// Stored as one comma separated value. The first spelling of a tag wins
/// and insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Parse comma separated text, trimming and dropping empty labels
    pub fn parse(raw: &str) -> Self {
        let mut tags = Self::default();
        for tag in raw.split(',') {
            tags.insert(tag);
        }
        tags
    }

    /// Add a tag unless an equal one (ignoring case) is present
    ///
    /// Returns `true` when the tag was added.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    /// Case-insensitive membership
    pub fn contains(&self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        self.0.iter().any(|t| t.to_lowercase() == tag)
    }

    /// Tags of `self` followed by the tags of `other` not already present
    pub fn union(&self, other: &TagSet) -> TagSet {
        let mut merged = self.clone();
        for tag in &other.0 {
            merged.insert(tag);
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

impl From<&str> for TagSet {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.map(|s| TagSet::parse(&s)).unwrap_or_default())
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_new() {
        let link = Link::new("https://example.com");
        assert_eq!(link.url, "https://example.com");
        assert!(link.id.is_empty());
        assert!(link.title.is_empty());
        assert!(link.tags.is_empty());
        assert!(!link.is_read());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://localhost:8080/path?q=1").is_ok());

        for bad in ["", "example.com", "/relative/path", "mailto:me@example.com", "not a url"] {
            let err = validate_url(bad).unwrap_err();
            assert!(matches!(err, StoreError::InvalidUrl { .. }), "{bad}");
        }
    }

    #[test]
    fn test_tagset_parse() {
        let tags = TagSet::parse(" rust, Web ,,web,RUST , cli");
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["rust", "Web", "cli"]);
        assert_eq!(tags.to_string(), "rust,Web,cli");
        assert!(TagSet::parse("").is_empty());
        assert!(TagSet::parse(" , ,").is_empty());
    }

    #[test]
    fn test_tagset_contains_ignores_case() {
        let tags = TagSet::parse("Rust,web");
        assert!(tags.contains("rust"));
        assert!(tags.contains("WEB"));
        assert!(!tags.contains("cli"));
    }

    #[test]
    fn test_tagset_union_keeps_order_and_first_casing() {
        let existing = TagSet::parse("x,Y");
        let incoming = TagSet::parse("y,z,X,w");
        let merged = existing.union(&incoming);
        assert_eq!(merged.to_string(), "x,Y,z,w");
        // inputs untouched
        assert_eq!(existing.len(), 2);
    }

    #[test]
    fn test_tagset_insert() {
        let mut tags = TagSet::default();
        assert!(tags.insert("read-later"));
        assert!(!tags.insert("Read-Later"));
        assert!(!tags.insert("  "));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_draft_builder() {
        let draft = LinkDraft::new("https://a.test")
            .title("A")
            .note("n")
            .tags("x,y");
        assert_eq!(draft.url, "https://a.test");
        assert_eq!(draft.title, "A");
        assert_eq!(draft.note, "n");
        assert_eq!(draft.tags, TagSet::parse("x,y"));
    }

    #[test]
    fn test_list_options_default_is_unread() {
        let opts = ListOptions::default();
        assert_eq!(opts.read_status, ReadStatus::Unread);
        assert_eq!(ListOptions::all().read_status, ReadStatus::All);
    }
}
