//! Short link identifiers
//!
//! New ids are 128 random bits (a v4 UUID) written as unpadded, lowercase
//! RFC 4648 base-32: always 26 characters from `[a-z2-7]`.
//!
//! Validation is wider than the generator. Stores created by
//! older versions carry 12-character hex ids, and some ids were written in
//! upper case, so any ASCII alphanumeric string of 10 to 30 characters is
//! accepted.

use uuid::Uuid;

/// Length of an id produced by [`new_id`]
pub const ID_LEN: usize = 26;

/// Shortest id accepted by [`is_valid_id`]
pub const MIN_ID_LEN: usize = 10;

/// Longest id accepted by [`is_valid_id`]
pub const MAX_ID_LEN: usize = 30;

const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Generate a new short id
///
/// Uniqueness is not checked against the store. A collision shows up as a
/// primary key violation on insert and is treated as a storage failure.
pub fn new_id() -> String {
    encode_base32(Uuid::new_v4().as_bytes())
}

/// Check that an externally supplied id is well formed
pub fn is_valid_id(id: &str) -> bool {
    (MIN_ID_LEN..=MAX_ID_LEN).contains(&id.len())
        && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Unpadded lowercase base-32 (RFC 4648 alphabet)
fn encode_base32(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }

    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}
