//! Outbound handshake messages.
//!
//! Each message is a text frame made of `Key:Value` header lines
//! separated by CRLF, a blank line, then the body:
//!
//! ```text
//! X-Timestamp:<ts>\r\nContent-Type:application/json; charset=utf-8\r\nPath:speech.config\r\n\r\n<json>
//! X-RequestId:<id>\r\nX-Timestamp:<ts>\r\nContent-Type:application/ssml+xml\r\nPath:ssml\r\n\r\n<markup>
//! ```
//!
//! The configuration message must be sent first: the service applies the
//! output format from it to the markup that follows.

use serde_json::json;

use crate::ssml::{SsmlOptions, render_ssml};

/// 24kHz, 48kbps mono MP3.
pub const DEFAULT_OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

/// Path of the configuration message.
pub const PATH_SPEECH_CONFIG: &str = "speech.config";
/// Path of the markup message.
pub const PATH_SSML: &str = "ssml";

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
const CONTENT_TYPE_SSML: &str = "application/ssml+xml";

/// Renders the handshake messages of a session.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    output_format: String,
    ssml: SsmlOptions,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    /// Creates a builder with the default output format and markup options.
    pub fn new() -> Self {
        Self {
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            ssml: SsmlOptions::default(),
        }
    }

    /// Sets the requested output format.
    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    /// Returns the requested output format.
    pub fn output_format_str(&self) -> &str {
        &self.output_format
    }

    /// Sets the markup options.
    pub fn ssml_options(mut self, opts: SsmlOptions) -> Self {
        self.ssml = opts;
        self
    }

    /// Renders the configuration message.
    ///
    /// Sentence-boundary metadata is disabled, word-boundary metadata is
    /// enabled.
    pub fn config_message(&self, timestamp: &str) -> String {
        let body = json!({
            "context": {
                "synthesis": {
                    "audio": {
                        "metadataoptions": {
                            "sentenceBoundaryEnabled": "false",
                            "wordBoundaryEnabled": "true"
                        },
                        "outputFormat": self.output_format
                    }
                }
            }
        });

        format!(
            "X-Timestamp:{timestamp}\r\nContent-Type:{CONTENT_TYPE_JSON}\r\nPath:{PATH_SPEECH_CONFIG}\r\n\r\n{body}"
        )
    }

    /// Renders the markup message for `text` spoken by `voice`.
    ///
    /// Neither `text` nor `voice` is escaped.
    pub fn synthesis_message(
        &self,
        request_id: &str,
        timestamp: &str,
        text: &str,
        voice: &str,
    ) -> String {
        let markup = render_ssml(text, voice, &self.ssml);
        format!(
            "X-RequestId:{request_id}\r\nX-Timestamp:{timestamp}\r\nContent-Type:{CONTENT_TYPE_SSML}\r\nPath:{PATH_SSML}\r\n\r\n{markup}"
        )
    }
}

/// Renders the configuration message with default settings.
pub fn build_config_message(timestamp: &str) -> String {
    MessageBuilder::new().config_message(timestamp)
}

/// Renders the markup message with default settings.
pub fn build_synthesis_message(request_id: &str, timestamp: &str, text: &str, voice: &str) -> String {
    MessageBuilder::new().synthesis_message(request_id, timestamp, text, voice)
}
