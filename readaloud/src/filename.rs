//! Suggested file names for saved audio.

use chrono::{DateTime, Utc};

/// Prefix of suggested file names.
pub const FILENAME_PREFIX: &str = "japanese_tts_";

/// Extension of suggested file names.
pub const FILENAME_EXTENSION: &str = "mp3";

const MAX_STEM_CHARS: usize = 20;

/// Derives a file name from the request text.
///
/// Keeps the first 20 kana and CJK ideograph characters of `text`. When
/// there are none, the stem is `now` as `YYYYMMDDTHHMMSS`.
pub fn suggest_filename(text: &str, now: DateTime<Utc>) -> String {
    let stem: String = text
        .chars()
        .filter(|c| is_filename_char(*c))
        .take(MAX_STEM_CHARS)
        .collect();

    let stem = if stem.is_empty() {
        now.format("%Y%m%dT%H%M%S").to_string()
    } else {
        stem
    };

    format!("{FILENAME_PREFIX}{stem}.{FILENAME_EXTENSION}")
}

fn is_filename_char(c: char) -> bool {
    matches!(
        c,
        '\u{3040}'..='\u{309F}' // hiragana
            | '\u{30A0}'..='\u{30FF}' // katakana
            | '\u{4E00}'..='\u{9FAF}' // CJK unified ideographs
            | '\u{3400}'..='\u{4DBF}' // CJK extension A
    )
}
