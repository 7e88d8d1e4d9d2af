//! Error types for the read-aloud synthesis client.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for read-aloud operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for read-aloud synthesis.
///
/// Each synthesis attempt yields at most one of these. Malformed binary
/// frames never show up here: the frame parser absorbs them.
#[derive(Error, Debug)]
pub enum Error {
    /// The request was rejected before a session started.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Open, send or protocol failure at the connection layer.
    #[error("connection error: {0}")]
    Transport(String),

    /// Endpoint URL could not be parsed.
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    /// No terminal signal arrived within the session deadline.
    #[error("request timeout after {0:?}")]
    Timeout(Duration),

    /// The turn completed but no audio bytes were received.
    #[error("no audio data received")]
    EmptyResult,

    /// The connection closed before the end of the turn.
    #[error("connection closed unexpectedly ({chunks} audio chunks received)")]
    ConnectionClosed { chunks: usize },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if the session hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns true if the failure happened at the connection layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::ConnectionClosed { .. })
    }

    /// Returns true if the turn finished without audio.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Error::EmptyResult)
    }

    /// Returns true if the request never reached the service.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
