//! Helpers for decoding raw registry value bytes.

use chrono::{DateTime, Utc};
use encoding_rs::UTF_16LE;

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
const FILETIME_UNIX_DIFF: i64 = 11_644_473_600;

/// FILETIME ticks per second (100ns intervals).
const FILETIME_TICKS_PER_SECOND: u64 = 10_000_000;

/// Decodes a UTF-16LE byte slice, trimming null terminators.
///
/// The registry does not enforce well-formed string data, so decoding is lossy:
/// a dangling odd byte is dropped and unpaired surrogates become U+FFFD.
pub fn read_utf16_string(data: &[u8]) -> String {
    let even = &data[..data.len() - data.len() % 2];
    let (decoded, _had_errors) = UTF_16LE.decode_without_bom_handling(even);
    decoded.trim_end_matches('\0').to_string()
}

/// Decodes a `REG_MULTI_SZ` payload into its non-empty strings.
pub fn read_utf16_multi_string(data: &[u8]) -> Vec<String> {
    read_utf16_string(data)
        .split('\0')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Encodes a string as UTF-16LE with a terminating null.
pub fn to_utf16_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

/// Converts a Windows FILETIME (100ns ticks since 1601) to UTC.
///
/// Returns `None` for a zero timestamp or one outside chrono's range.
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let seconds = (filetime / FILETIME_TICKS_PER_SECOND) as i64 - FILETIME_UNIX_DIFF;
    let nanos = ((filetime % FILETIME_TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(seconds, nanos)
}
