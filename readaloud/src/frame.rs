//! Inbound binary frame parsing.
//!
//! Frame format:
//! - header length (2 bytes, big endian)
//! - header (header length bytes, UTF-8 `Key:Value` lines separated by CRLF)
//! - payload (remaining bytes, may be empty)
//!
//! The service multiplexes control and audio frames over the binary
//! channel, and occasionally sends audio without a usable header. The
//! parser trades strictness for availability: frames it cannot decode are
//! kept as audio when they are large enough, see [`FrameTolerance`].

use std::str::Utf8Error;

use bytes::Bytes;
use thiserror::Error;

/// Size of the header length prefix.
pub const HEADER_LENGTH_SIZE: usize = 2;

/// Frames whose header length overruns the frame are kept as audio only
/// above this many bytes.
pub const DEFAULT_HEADER_OVERFLOW_FLOOR: usize = 100;

/// Frames that fail to decode are kept as audio only above this many bytes.
pub const DEFAULT_PARSE_FAILURE_FLOOR: usize = 1000;

const AUDIO_MARKERS: [&str; 2] = ["Path:audio", "Content-Type:audio"];

/// Size thresholds of the fallback heuristics.
///
/// A frame is treated as raw audio only when it is strictly larger than the
/// relevant floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTolerance {
    /// Floor applied when the header length is `>=` the frame length.
    pub header_overflow_floor: usize,
    /// Floor applied when the header cannot be decoded.
    pub parse_failure_floor: usize,
}

impl Default for FrameTolerance {
    fn default() -> Self {
        Self {
            header_overflow_floor: DEFAULT_HEADER_OVERFLOW_FLOOR,
            parse_failure_floor: DEFAULT_PARSE_FAILURE_FLOOR,
        }
    }
}

impl FrameTolerance {
    /// Disables both heuristics: malformed frames are always skipped.
    pub fn strict() -> Self {
        Self {
            header_overflow_floor: usize::MAX,
            parse_failure_floor: usize::MAX,
        }
    }
}

/// Reasons a binary frame cannot be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than the header length prefix.
    #[error("frame too short: {0} bytes")]
    TooShort(usize),

    /// Header length is at or beyond the frame length.
    #[error("header length {header_length} overruns frame of {frame_length} bytes")]
    HeaderOverflow {
        header_length: u16,
        frame_length: usize,
    },

    /// Header region extends past the end of the frame.
    #[error("header of {header_length} bytes truncated in frame of {frame_length} bytes")]
    Truncated {
        header_length: u16,
        frame_length: usize,
    },

    /// Header is not valid UTF-8.
    #[error("invalid header encoding: {0}")]
    InvalidHeader(#[from] Utf8Error),
}

/// A decoded binary frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFrame {
    /// Value of the 2-byte prefix.
    pub header_length: u16,
    /// Header block as text.
    pub header_text: String,
    /// Bytes after the header, `None` when there are none.
    pub payload: Option<Bytes>,
}

impl BinaryFrame {
    /// Decodes `data` into header and payload.
    pub fn decode(data: &Bytes) -> Result<Self, FrameError> {
        let frame_length = data.len();
        if frame_length < HEADER_LENGTH_SIZE {
            return Err(FrameError::TooShort(frame_length));
        }

        let header_length = u16::from_be_bytes([data[0], data[1]]);
        if usize::from(header_length) >= frame_length {
            return Err(FrameError::HeaderOverflow {
                header_length,
                frame_length,
            });
        }

        let header_end = HEADER_LENGTH_SIZE + usize::from(header_length);
        if header_end > frame_length {
            return Err(FrameError::Truncated {
                header_length,
                frame_length,
            });
        }

        let header_text = std::str::from_utf8(&data[HEADER_LENGTH_SIZE..header_end])?.to_string();
        let payload = (header_end < frame_length).then(|| data.slice(header_end..));

        Ok(Self {
            header_length,
            header_text,
            payload,
        })
    }

    /// Iterates over the `Key:Value` header lines.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header_text
            .split("\r\n")
            .filter_map(|line| line.split_once(':'))
    }

    /// Returns the first value of header `key`.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Returns true if the header marks the payload as audio.
    pub fn is_audio(&self) -> bool {
        AUDIO_MARKERS
            .iter()
            .any(|marker| self.header_text.contains(marker))
    }
}

/// Classification of an inbound binary frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedFrame {
    /// Payload of a well-formed audio frame.
    Audio(Bytes),
    /// Nothing to keep.
    Skip,
    /// Whole frame kept as audio by a fallback heuristic.
    FallbackAudio(Bytes),
}

impl ParsedFrame {
    /// Returns the audio bytes, if any.
    pub fn into_audio(self) -> Option<Bytes> {
        match self {
            ParsedFrame::Audio(b) | ParsedFrame::FallbackAudio(b) => Some(b),
            ParsedFrame::Skip => None,
        }
    }

    /// Returns true for [`ParsedFrame::Skip`].
    pub fn is_skip(&self) -> bool {
        matches!(self, ParsedFrame::Skip)
    }
}

/// Classifies inbound binary frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameParser {
    tolerance: FrameTolerance,
}

impl FrameParser {
    /// Creates a parser with the given thresholds.
    pub fn new(tolerance: FrameTolerance) -> Self {
        Self { tolerance }
    }

    /// Returns the thresholds in use.
    pub fn tolerance(&self) -> FrameTolerance {
        self.tolerance
    }

    /// Classifies one binary frame.
    pub fn parse(&self, data: Bytes) -> ParsedFrame {
        match BinaryFrame::decode(&data) {
            Ok(frame) if frame.is_audio() => match frame.payload {
                Some(payload) => ParsedFrame::Audio(payload),
                None => ParsedFrame::Skip,
            },
            Ok(_) => ParsedFrame::Skip,
            Err(FrameError::TooShort(_)) => ParsedFrame::Skip,
            Err(FrameError::HeaderOverflow { .. }) => {
                self.fallback(data, self.tolerance.header_overflow_floor)
            }
            Err(FrameError::Truncated { .. }) | Err(FrameError::InvalidHeader(_)) => {
                self.fallback(data, self.tolerance.parse_failure_floor)
            }
        }
    }

    fn fallback(&self, data: Bytes, floor: usize) -> ParsedFrame {
        if data.len() > floor {
            ParsedFrame::FallbackAudio(data)
        } else {
            ParsedFrame::Skip
        }
    }
}
