//! Request correlation identifiers and protocol timestamps.

use chrono::{DateTime, Utc};
use rand::Rng;

const REQUEST_ID_TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";

/// Identity of a single synthesis attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    /// 36-character UUID-v4 shaped token.
    pub id: String,
    /// Compact timestamp, see [`format_timestamp`].
    pub timestamp: String,
}

impl RequestIdentity {
    /// Creates an identity from the given random source and instant.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Self {
        Self {
            id: new_request_id(rng),
            timestamp: format_timestamp(now),
        }
    }

    /// Creates an identity using the thread-local generator and the current time.
    pub fn now() -> Self {
        Self::generate(&mut rand::thread_rng(), Utc::now())
    }
}

/// Returns a lowercase UUID-v4 shaped correlation token.
///
/// This is not a security credential; any random source will do.
pub fn new_request_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    REQUEST_ID_TEMPLATE
        .chars()
        .map(|c| match c {
            'x' => hex_digit(rng.gen_range(0..16)),
            // variant nibble: 10xx
            'y' => hex_digit(rng.gen_range(0..16) & 0x3 | 0x8),
            other => other,
        })
        .collect()
}

/// Returns the current time as a compact protocol timestamp.
pub fn new_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Formats `at` as an ISO-8601 instant with `-`/`:` removed and the
/// fractional seconds dropped, e.g. `20240102T030405Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

fn hex_digit(n: u8) -> char {
    char::from_digit(u32::from(n), 16).unwrap_or('0')
}
