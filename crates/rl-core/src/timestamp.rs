//! Timestamp parsing, normalization and display
//!
//! Three textual forms are accepted on read:
//! - RFC 3339 (`2024-01-01T12:00:00Z`, any offset)
//! - space separated date-time, taken as UTC (`2024-01-01 12:00:00`)
//! - bare date, taken as midnight UTC (`2024-01-01`)
//!
//! Everything is written back in one canonical form: RFC 3339 in UTC with
//! second precision. Canonical strings sort chronologically, which the
//! `ORDER BY created_at` queries rely on.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Current time, truncated to the canonical precision
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Parse any accepted form; `None` for empty or unrecognized text
pub fn parse(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}

/// Canonical storage and wire form
pub fn format(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Human readable rendering in an explicit zone
pub fn display(dt: &DateTime<Utc>, zone: &DisplayZone) -> String {
    match zone {
        DisplayZone::Utc => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        DisplayZone::Local => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string(),
        DisplayZone::Fixed(offset) => dt
            .with_timezone(offset)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string(),
        // %Z follows daylight saving, e.g. EST / EDT
        DisplayZone::Named(tz) => dt
            .with_timezone(tz)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string(),
    }
}

/// Zone used when rendering timestamps for people
///
/// Configured as `utc`, `local`, a fixed offset like `-05:00`, or an IANA
/// zone name like `America/New_York`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DisplayZone {
    #[default]
    Utc,
    Local,
    Fixed(FixedOffset),
    Named(Tz),
}

impl FromStr for DisplayZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(DisplayZone::Utc);
        }
        if s.eq_ignore_ascii_case("local") {
            return Ok(DisplayZone::Local);
        }
        if let Some(offset) = parse_offset(s) {
            return Ok(DisplayZone::Fixed(offset));
        }
        s.parse::<Tz>().map(DisplayZone::Named).map_err(|_| {
            format!(
                "invalid timezone '{}': expected utc, local, +HH:MM or a zone name",
                s
            )
        })
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayZone::Utc => write!(f, "utc"),
            DisplayZone::Local => write!(f, "local"),
            DisplayZone::Fixed(offset) => write!(f, "{}", offset),
            DisplayZone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

impl TryFrom<String> for DisplayZone {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DisplayZone> for String {
    fn from(zone: DisplayZone) -> Self {
        zone.to_string()
    }
}

/// `+HH:MM` / `-HH:MM`
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Serde adapter for optional timestamps in the JSON wire format
///
/// Accepts `null`, an empty string, or any form [`parse`] understands.
/// Unrecognized text is a decode error rather than a silent zero.
pub mod serde_opt {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&super::format(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(text) if text.trim().is_empty() => Ok(None),
            Some(text) => super::parse(&text)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(
            parse("2024-01-01T12:00:00Z"),
            Some(utc(2024, 1, 1, 12, 0, 0))
        );
        // offsets are normalized to UTC
        assert_eq!(
            parse("2024-01-01T07:00:00-05:00"),
            Some(utc(2024, 1, 1, 12, 0, 0))
        );
    }

    #[test]
    fn test_parse_space_separated() {
        assert_eq!(
            parse("2024-01-02 10:30:00"),
            Some(utc(2024, 1, 2, 10, 30, 0))
        );
    }

    #[test]
    fn test_parse_bare_date() {
        assert_eq!(parse("2024-01-02"), Some(utc(2024, 1, 2, 0, 0, 0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("yesterday"), None);
        assert_eq!(parse("2024-13-45"), None);
    }

    #[test]
    fn test_format_is_canonical() {
        let dt = parse("2024-01-02 10:30:00").unwrap();
        assert_eq!(format(&dt), "2024-01-02T10:30:00Z");

        let dt = parse("2024-01-01T07:00:00.123-05:00").unwrap();
        assert_eq!(format(&dt), "2024-01-01T12:00:00Z");
    }

    #[test]
    fn test_now_has_no_subseconds() {
        assert_eq!(now().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_display_pinned_zones() {
        let dt = utc(2024, 1, 1, 12, 0, 0);
        assert_eq!(display(&dt, &DisplayZone::Utc), "2024-01-01 12:00:00 UTC");

        let est: DisplayZone = "-05:00".parse().unwrap();
        assert_eq!(display(&dt, &est), "2024-01-01 07:00:00 -05:00");

        let ist: DisplayZone = "+05:30".parse().unwrap();
        assert_eq!(display(&dt, &ist), "2024-01-01 17:30:00 +05:30");
    }

    #[test]
    fn test_display_named_zone_follows_dst() {
        let new_york: DisplayZone = "America/New_York".parse().unwrap();

        let winter = utc(2024, 1, 15, 12, 0, 0);
        assert_eq!(display(&winter, &new_york), "2024-01-15 07:00:00 EST");

        let summer = utc(2024, 7, 15, 12, 0, 0);
        assert_eq!(display(&summer, &new_york), "2024-07-15 08:00:00 EDT");
    }

    #[test]
    fn test_display_zone_parsing() {
        assert_eq!("UTC".parse::<DisplayZone>().unwrap(), DisplayZone::Utc);
        assert_eq!("local".parse::<DisplayZone>().unwrap(), DisplayZone::Local);
        assert_eq!(
            "America/New_York".parse::<DisplayZone>().unwrap(),
            DisplayZone::Named(Tz::America__New_York)
        );
        assert!("America/Nowhere".parse::<DisplayZone>().is_err());
        assert!("+24:00".parse::<DisplayZone>().is_err());
        assert!("0500".parse::<DisplayZone>().is_err());
    }

    #[test]
    fn test_display_zone_round_trips_through_string() {
        for zone in ["utc", "local", "-05:00", "+09:30", "Europe/Berlin"] {
            let parsed: DisplayZone = zone.parse().unwrap();
            assert_eq!(parsed.to_string(), zone);
        }
    }
}
