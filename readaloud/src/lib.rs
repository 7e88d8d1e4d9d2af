//! Read-aloud speech synthesis client for Rust.
//!
//! This crate turns a short text into MP3 audio through the read-aloud
//! streaming WebSocket service. Each synthesis opens one connection,
//! sends a configuration message and an SSML message, collects the audio
//! frames until the end-of-turn signal and returns the concatenated audio.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use readaloud::{Client, SynthesisRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new()?;
//!
//!     let result = client
//!         .synthesize(&SynthesisRequest::new("こんにちは、世界", "ja-JP-NanamiNeural"))
//!         .await?;
//!
//!     println!("Audio length: {} bytes ({})", result.audio.len(), result.mime_type);
//!     Ok(())
//! }
//! ```
//!
//! # Observing a session
//!
//! ```rust,no_run
//! # async fn demo(client: readaloud::Client) -> readaloud::Result<()> {
//! let session = client.session();
//! let mut states = session.subscribe();
//! tokio::spawn(async move {
//!     while states.changed().await.is_ok() {
//!         println!("state: {}", *states.borrow());
//!     }
//! });
//! let request = readaloud::SynthesisRequest::with_default_voice("テスト");
//! let result = session.run(&request).await?;
//! # Ok(())
//! # }
//! ```

mod accumulator;
mod client;
mod error;
mod filename;
pub mod frame;
mod identity;
pub mod message;
mod session;
pub mod ssml;
pub mod transport;
mod types;
mod voice;

pub use accumulator::ChunkAccumulator;
pub use client::{Client, ClientBuilder, DEFAULT_ENDPOINT, DEFAULT_TRUSTED_CLIENT_TOKEN};
pub use error::{Error, Result};
pub use filename::suggest_filename;
pub use frame::{FrameParser, FrameTolerance, ParsedFrame};
pub use identity::{RequestIdentity, format_timestamp, new_request_id, new_timestamp};
pub use message::{MessageBuilder, build_config_message, build_synthesis_message};
pub use session::{DEFAULT_TIMEOUT, SessionConfig, SynthesisSession, TURN_END_MARKER};
pub use ssml::{escape_text, render_ssml};
pub use transport::{Connector, Transport, TransportEvent, WsConnector};
pub use types::*;
pub use voice::{DEFAULT_VOICE, Gender, VOICES, Voice, find_voice};
