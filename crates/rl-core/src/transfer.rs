//! JSON export format
//!
//! An export is a JSON array of link objects:
//!
//! ```json
//! [
//!   {
//!     "id": "mzxw6ytboiaaaaaaaaaaaaaaaa",
//!     "url": "https://example.com",
//!     "title": "Example",
//!     "tags": "rust,web",
//!     "created_at": "2024-01-01T12:00:00Z",
//!     "read_at": "2024-01-02T08:00:00Z"
//!   }
//! ]
//! ```
//!
//! Empty `title`, `note` and `tags` and a null `read_at` are left out on
//! encode. On decode `id` may be missing, optional fields may be `null`,
//! and timestamps may use any form `timestamp::parse` accepts.

use crate::models::Link;
use crate::storage::{StoreError, StoreResult};

/// Encode links as a pretty-printed JSON array
pub fn encode(links: &[Link]) -> StoreResult<String> {
    serde_json::to_string_pretty(links).map_err(StoreError::Serialize)
}

/// Decode a JSON array of links
pub fn decode(json: &str) -> StoreResult<Vec<Link>> {
    serde_json::from_str(json).map_err(StoreError::InvalidJson)
}
