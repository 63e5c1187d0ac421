//! Display helpers for addresses, hashes, and poll timestamps.

use chrono::{Local, TimeZone, Utc};

/// Shorten a long string (an address or hash) by keeping `start_chars` from
/// the front and `end_chars` from the back, padding with dots up to
/// `max_length`. Strings at or under `max_length` pass through unchanged.
pub fn truncate(text: &str, start_chars: usize, end_chars: usize, max_length: usize) -> String {
    if text.len() <= max_length {
        return text.to_string();
    }

    let mut start = text.chars().take(start_chars).collect::<String>();
    let end = text
        .chars()
        .skip(text.chars().count().saturating_sub(end_chars))
        .collect::<String>();

    while start.len() + end.len() < max_length {
        start.push('.');
    }
    start + &end
}

/// "Wed, Aug 30, 2026" for a Unix-millisecond timestamp, in UTC.
pub fn format_date(timestamp_ms: u64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms as i64).single() {
        Some(date) => date.format("%a, %b %-d, %Y").to_string(),
        None => String::new(),
    }
}

/// "YYYY-MM-DDTHH:MM" in local time, the shape datetime-local inputs expect.
pub fn format_timestamp(timestamp_ms: u64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms as i64).single() {
        Some(date) => date.format("%Y-%m-%dT%H:%M").to_string(),
        None => String::new(),
    }
}
