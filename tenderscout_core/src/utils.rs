//! Shared helpers for cleaning up source payloads.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip markup and collapse whitespace in free-text fields.
///
/// Several sources ship titles and descriptions with embedded HTML
/// fragments and doubly-encoded entities; canonical records carry plain
/// text only.
pub fn clean_markup(text: &str) -> String {
    let mut cleaned = text.to_string();
    // Try decoding twice in case of double-encoding
    for _ in 0..2 {
        let decoded = html_escape::decode_html_entities(&cleaned).into_owned();
        if decoded == cleaned {
            break;
        }
        cleaned = decoded;
    }

    let stripped = TAG_RE.replace_all(&cleaned, " ");
    WS_RE.replace_all(stripped.trim(), " ").into_owned()
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Parse the timestamp formats seen across source payloads.
///
/// Tries RFC 3339 first, then a bare datetime, then a bare date (midnight
/// UTC). Returns `None` rather than failing the record.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    // US-style dates (SAM.gov)
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    None
}
