//! Common types for read-aloud synthesis.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::voice::DEFAULT_VOICE;

/// MIME type of synthesized audio.
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// A text to speak with a given voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Text to synthesize, inserted into the markup as is.
    pub text: String,
    /// Voice short name (e.g. "ja-JP-NanamiNeural").
    #[serde(default = "default_voice")]
    pub voice: String,
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

impl SynthesisRequest {
    /// Creates a request.
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
        }
    }

    /// Creates a request for the default voice.
    pub fn with_default_voice(text: impl Into<String>) -> Self {
        Self::new(text, DEFAULT_VOICE)
    }

    /// Rejects requests that must not reach the service.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::Validation("text is empty".to_string()));
        }
        Ok(())
    }
}

/// Audio produced by a successful session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    /// Concatenated audio payload.
    pub audio: Bytes,
    /// Always [`AUDIO_MIME_TYPE`].
    pub mime_type: &'static str,
    /// Correlation id of the attempt.
    pub request_id: String,
}

impl SynthesisResult {
    pub(crate) fn new(audio: Bytes, request_id: String) -> Self {
        Self {
            audio,
            mime_type: AUDIO_MIME_TYPE,
            request_id,
        }
    }

    /// Returns the audio length in bytes.
    pub fn len(&self) -> usize {
        self.audio.len()
    }

    /// Returns true if there is no audio. Never true for a session result.
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }
}

/// Diagnostic verbosity of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Only failures are reported, through the returned error.
    #[default]
    Quiet,
    /// Every event is logged at debug level.
    Verbose,
}

impl Verbosity {
    /// Verbose for local development endpoints, quiet otherwise.
    pub fn detect(endpoint: &Url) -> Self {
        match endpoint.host_str() {
            None | Some("") | Some("localhost") | Some("127.0.0.1") | Some("[::1]") => {
                Verbosity::Verbose
            }
            Some(_) => Verbosity::Quiet,
        }
    }

    /// Returns true for [`Verbosity::Verbose`].
    pub fn is_verbose(self) -> bool {
        self == Verbosity::Verbose
    }
}

/// States of a synthesis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    AwaitingAudio,
    Finalizing,
    Resolved,
    Failed,
}

impl SessionState {
    /// Returns true for `Resolved` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Resolved | SessionState::Failed)
    }

    /// Returns the state name.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingAudio => "awaiting_audio",
            SessionState::Finalizing => "finalizing",
            SessionState::Resolved => "resolved",
            SessionState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(SynthesisRequest::new("こんにちは", "ja-JP-NanamiNeural").validate().is_ok());
        assert!(SynthesisRequest::new("   \n", "v").validate().unwrap_err().is_validation());
        assert!(SynthesisRequest::new("text", "").validate().is_ok());
    }

    #[test]
    fn test_request_default_voice_from_yaml() {
        let req: SynthesisRequest = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(req.voice, DEFAULT_VOICE);
    }

    #[test]
    fn test_verbosity_detect() {
        let local = Url::parse("ws://localhost:8080/v1").unwrap();
        let loopback = Url::parse("ws://127.0.0.1:9000").unwrap();
        let remote = Url::parse("wss://speech.platform.bing.com/v1").unwrap();
        assert_eq!(Verbosity::detect(&local), Verbosity::Verbose);
        assert_eq!(Verbosity::detect(&loopback), Verbosity::Verbose);
        assert_eq!(Verbosity::detect(&remote), Verbosity::Quiet);
    }

    #[test]
    fn test_session_state_terminal() {
        assert!(SessionState::Resolved.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::AwaitingAudio.is_terminal());
        assert_eq!(SessionState::AwaitingAudio.to_string(), "awaiting_audio");
    }
}
