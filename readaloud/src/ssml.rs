//! SSML markup rendering for synthesis requests.
//!
//! The text and voice are inserted verbatim. Callers that feed untrusted
//! input must sanitize it first, e.g. with [`escape_text`].

use serde::{Deserialize, Serialize};

/// Default markup language.
pub const DEFAULT_LANGUAGE: &str = "ja-JP";

/// Default prosody rate and pitch.
pub const DEFAULT_PROSODY: &str = "medium";

/// Options for the `<speak>` / `<prosody>` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsmlOptions {
    /// `xml:lang` of the document.
    pub language: String,
    /// Prosody rate (e.g. "medium", "+10%").
    pub rate: String,
    /// Prosody pitch (e.g. "medium", "-5Hz").
    pub pitch: String,
}

impl Default for SsmlOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            rate: DEFAULT_PROSODY.to_string(),
            pitch: DEFAULT_PROSODY.to_string(),
        }
    }
}

/// Wraps `text` in a voice and prosody declaration for `voice`.
pub fn render_ssml(text: &str, voice: &str, opts: &SsmlOptions) -> String {
    format!(
        concat!(
            r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" xml:lang="{lang}">"#,
            r#"<voice name="{voice}">"#,
            r#"<prosody rate="{rate}" pitch="{pitch}">{text}</prosody>"#,
            "</voice></speak>",
        ),
        lang = opts.language,
        voice = voice,
        rate = opts.rate,
        pitch = opts.pitch,
        text = text,
    )
}

/// Escapes the five XML special characters.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
