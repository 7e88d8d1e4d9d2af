//! One synthesis attempt over one connection.
//!
//! A session walks `Idle -> Connecting -> AwaitingAudio -> Finalizing ->
//! Resolved`, or drops to `Failed` from any non-terminal state. It is
//! consumed by [`SynthesisSession::run`], so it produces exactly one
//! outcome and never reconnects.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, watch};
use tracing::debug;
use url::Url;

use crate::accumulator::ChunkAccumulator;
use crate::error::{Error, Result};
use crate::frame::{BinaryFrame, FrameParser, FrameTolerance, ParsedFrame};
use crate::identity::RequestIdentity;
use crate::message::MessageBuilder;
use crate::transport::{Connector, Transport, TransportEvent};
use crate::types::{SessionState, SynthesisRequest, SynthesisResult, Verbosity};

/// Text-frame marker for the end of synthesis.
pub const TURN_END_MARKER: &str = "Path:turn.end";

/// Default session deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// Longest path is four transitions.
const TRANSITION_CAPACITY: usize = 8;

/// Logs at debug level only when the session is verbose.
macro_rules! verbose {
    ($session:expr, $($arg:tt)+) => {
        if $session.config.verbosity.is_verbose() {
            debug!($($arg)+);
        }
    };
}

/// Settings shared by every session of a client.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Service endpoint without query parameters.
    pub endpoint: Url,
    /// Value of the `TrustedClientToken` query parameter.
    pub trusted_client_token: String,
    /// Deadline of a whole session.
    pub timeout: Duration,
    pub verbosity: Verbosity,
    pub tolerance: FrameTolerance,
    pub messages: MessageBuilder,
}

impl SessionConfig {
    /// Creates a config for `endpoint` with default settings.
    pub fn new(endpoint: Url, trusted_client_token: impl Into<String>) -> Self {
        let verbosity = Verbosity::detect(&endpoint);
        Self {
            endpoint,
            trusted_client_token: trusted_client_token.into(),
            timeout: DEFAULT_TIMEOUT,
            verbosity,
            tolerance: FrameTolerance::default(),
            messages: MessageBuilder::new(),
        }
    }

    /// Returns the URL of the connection for `request_id`.
    pub fn connection_url(&self, request_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("TrustedClientToken", &self.trusted_client_token)
            .append_pair("ConnectionId", request_id);
        url
    }
}

enum Outcome {
    TurnEnd,
    Fail(Error),
}

/// A single-use synthesis attempt.
pub struct SynthesisSession {
    config: Arc<SessionConfig>,
    connector: Arc<dyn Connector>,
    parser: FrameParser,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    transition_tx: broadcast::Sender<SessionState>,
}

impl SynthesisSession {
    /// Creates an idle session.
    pub fn new(config: Arc<SessionConfig>, connector: Arc<dyn Connector>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (transition_tx, _) = broadcast::channel(TRANSITION_CAPACITY);
        let parser = FrameParser::new(config.tolerance);
        Self {
            config,
            connector,
            parser,
            state: SessionState::Idle,
            state_tx,
            transition_tx,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Subscribes to the latest state.
    ///
    /// Changes made without an await in between are coalesced; use
    /// [`SynthesisSession::transitions`] to see every state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Subscribes to every state change, in order. The stream ends once the
    /// session is done.
    pub fn transitions(&self) -> broadcast::Receiver<SessionState> {
        self.transition_tx.subscribe()
    }

    /// Runs the session with a fresh identity.
    pub async fn run(self, request: &SynthesisRequest) -> Result<SynthesisResult> {
        self.run_with_identity(request, RequestIdentity::now()).await
    }

    /// Runs the session with the given identity.
    ///
    /// Invalid requests fail before any connection is attempted.
    pub async fn run_with_identity(
        mut self,
        request: &SynthesisRequest,
        identity: RequestIdentity,
    ) -> Result<SynthesisResult> {
        request.validate()?;

        let url = self.config.connection_url(&identity.id);
        verbose!(self, request_id = %identity.id, "Starting synthesis ({} chars)", request.text.chars().count());

        self.transition(SessionState::Connecting);
        let mut transport = self.connector.connect(&url, self.config.verbosity);
        let mut chunks = ChunkAccumulator::new();

        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        let outcome = loop {
            let event = tokio::select! {
                _ = &mut deadline => {
                    verbose!(self, "Deadline of {:?} reached", self.config.timeout);
                    break Outcome::Fail(Error::Timeout(self.config.timeout));
                }
                event = transport.next_event() => event,
            };

            if let Some(outcome) = self
                .handle_event(event, transport.as_mut(), request, &identity, &mut chunks)
                .await
            {
                break outcome;
            }
        };

        transport.close().await;

        match outcome {
            Outcome::TurnEnd => self.finalize(chunks, identity.id),
            Outcome::Fail(e) => {
                verbose!(self, "Synthesis failed: {}", e);
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    /// Applies one transport event. Returns the outcome once the session
    /// must stop.
    async fn handle_event(
        &mut self,
        event: Option<TransportEvent>,
        transport: &mut dyn Transport,
        request: &SynthesisRequest,
        identity: &RequestIdentity,
        chunks: &mut ChunkAccumulator,
    ) -> Option<Outcome> {
        match event {
            Some(TransportEvent::Open) => {
                if self.state != SessionState::Connecting {
                    verbose!(self, "Ignoring duplicate open");
                    return None;
                }
                verbose!(self, "Connection open, sending config and markup");
                self.transition(SessionState::AwaitingAudio);

                let config = self.config.messages.config_message(&identity.timestamp);
                if let Err(e) = transport.send(config).await {
                    return Some(Outcome::Fail(e));
                }
                let markup = self.config.messages.synthesis_message(
                    &identity.id,
                    &identity.timestamp,
                    &request.text,
                    &request.voice,
                );
                if let Err(e) = transport.send(markup).await {
                    return Some(Outcome::Fail(e));
                }
                None
            }
            Some(TransportEvent::Text(body)) => {
                if body.contains(TURN_END_MARKER) {
                    verbose!(self, "Turn end after {} chunks", chunks.chunk_count());
                    Some(Outcome::TurnEnd)
                } else {
                    verbose!(self, "Text frame: {}", first_line(&body));
                    None
                }
            }
            Some(TransportEvent::Binary(data)) => {
                let len = data.len();
                if self.config.verbosity.is_verbose() {
                    log_frame_headers(&data);
                }
                match self.parser.parse(data) {
                    ParsedFrame::Audio(payload) => {
                        verbose!(self, bytes = payload.len(), chunks = chunks.chunk_count() + 1, "Audio chunk");
                        chunks.append(payload);
                    }
                    ParsedFrame::FallbackAudio(frame) => {
                        verbose!(self, bytes = len, "Unparsed frame kept as audio");
                        chunks.append(frame);
                    }
                    ParsedFrame::Skip => {
                        verbose!(self, bytes = len, "Skipped binary frame");
                    }
                }
                None
            }
            Some(TransportEvent::Error(msg)) => Some(Outcome::Fail(Error::Transport(msg))),
            Some(TransportEvent::Close { code, reason }) => {
                verbose!(self, "Connection closed: code={:?} reason={:?}", code, reason);
                Some(Outcome::Fail(Error::ConnectionClosed {
                    chunks: chunks.chunk_count(),
                }))
            }
            None => Some(Outcome::Fail(Error::ConnectionClosed {
                chunks: chunks.chunk_count(),
            })),
        }
    }

    fn finalize(mut self, chunks: ChunkAccumulator, request_id: String) -> Result<SynthesisResult> {
        self.transition(SessionState::Finalizing);
        let count = chunks.chunk_count();

        match chunks.finalize() {
            Ok(audio) => {
                verbose!(self, bytes = audio.len(), chunks = count, "Audio complete");
                if audio.len() > 4 {
                    verbose!(self, "Audio header: {}", hex::encode(&audio[..4]));
                }
                self.transition(SessionState::Resolved);
                Ok(SynthesisResult::new(audio, request_id))
            }
            Err(e) => {
                verbose!(self, "Turn ended without audio");
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        verbose!(self, from = %self.state, to = %next, "State changed");
        self.state = next;
        self.state_tx.send_replace(next);
        let _ = self.transition_tx.send(next);
    }
}

fn log_frame_headers(data: &Bytes) {
    match BinaryFrame::decode(data) {
        Ok(frame) => debug!(
            path = ?frame.header("Path"),
            request_id = ?frame.header("X-RequestId"),
            header_length = frame.header_length,
            "Binary frame"
        ),
        Err(e) => debug!(bytes = data.len(), "Undecodable binary frame: {}", e),
    }
}

fn first_line(body: &str) -> &str {
    body.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::transport::mock::{self, MockHandle};

    fn config() -> Arc<SessionConfig> {
        let endpoint = Url::parse("wss://speech.example.com/tts/v1").unwrap();
        Arc::new(SessionConfig::new(endpoint, "TOKEN"))
    }

    fn identity() -> RequestIdentity {
        let mut rng = StdRng::seed_from_u64(7);
        let now = chrono::DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        RequestIdentity::generate(&mut rng, now)
    }

    fn audio_frame(payload: &[u8]) -> TransportEvent {
        let header = b"X-RequestId:abc\r\nContent-Type:audio/mpeg\r\nPath:audio\r\n";
        let mut buf = Vec::new();
        buf.extend_from_slice(&(header.len() as u16).to_be_bytes());
        buf.extend_from_slice(header);
        buf.extend_from_slice(payload);
        TransportEvent::Binary(Bytes::from(buf))
    }

    fn turn_end() -> TransportEvent {
        TransportEvent::Text("X-RequestId:abc\r\nPath:turn.end\r\n\r\n{}".to_string())
    }

    fn close() -> TransportEvent {
        TransportEvent::Close {
            code: Some(1000),
            reason: String::new(),
        }
    }

    fn session(connector: Arc<mock::MockConnector>) -> SynthesisSession {
        SynthesisSession::new(config(), connector)
    }

    fn request() -> SynthesisRequest {
        SynthesisRequest::new("こんにちは", "ja-JP-NanamiNeural")
    }

    fn script(handle: &MockHandle, events: Vec<TransportEvent>) {
        for event in events {
            handle.push(event);
        }
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (connector, handle) = mock::pair();
        script(
            &handle,
            vec![
                TransportEvent::Open,
                audio_frame(&[0xFF, 0xF3, 0x44, 0xC4, 0x01]),
                TransportEvent::Text("Path:turn.start\r\n\r\n{}".to_string()),
                audio_frame(b"second"),
                turn_end(),
            ],
        );

        let session = session(connector);
        let states = session.subscribe();
        let id = identity();
        let result = session
            .run_with_identity(&request(), id.clone())
            .await
            .unwrap();

        let mut expected = vec![0xFF, 0xF3, 0x44, 0xC4, 0x01];
        expected.extend_from_slice(b"second");
        assert_eq!(result.audio, Bytes::from(expected));
        assert_eq!(result.mime_type, "audio/mpeg");
        assert_eq!(result.request_id, id.id);
        assert_eq!(*states.borrow(), SessionState::Resolved);
        assert_eq!(handle.close_count(), 1);

        let urls = handle.urls();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("wss://speech.example.com/tts/v1?"));
        assert!(urls[0].contains("TrustedClientToken=TOKEN"));
        assert!(urls[0].contains(&format!("ConnectionId={}", id.id)));
    }

    fn drain_transitions(rx: &mut broadcast::Receiver<SessionState>) -> Vec<SessionState> {
        let mut states = Vec::new();
        while let Ok(state) = rx.try_recv() {
            states.push(state);
        }
        states
    }

    #[tokio::test]
    async fn test_transitions_published_in_order() {
        let (connector, handle) = mock::pair();
        script(&handle, vec![TransportEvent::Open, audio_frame(b"a"), turn_end()]);

        let session = session(connector);
        let mut transitions = session.transitions();
        session.run_with_identity(&request(), identity()).await.unwrap();

        assert_eq!(
            drain_transitions(&mut transitions),
            vec![
                SessionState::Connecting,
                SessionState::AwaitingAudio,
                SessionState::Finalizing,
                SessionState::Resolved,
            ]
        );
    }

    #[tokio::test]
    async fn test_transitions_on_empty_turn() {
        let (connector, handle) = mock::pair();
        script(&handle, vec![TransportEvent::Open, turn_end()]);

        let session = session(connector);
        let mut transitions = session.transitions();
        session.run_with_identity(&request(), identity()).await.unwrap_err();

        assert_eq!(
            drain_transitions(&mut transitions),
            vec![
                SessionState::Connecting,
                SessionState::AwaitingAudio,
                SessionState::Finalizing,
                SessionState::Failed,
            ]
        );
    }

    #[tokio::test]
    async fn test_watch_sees_each_awaited_state() {
        let (connector, handle) = mock::pair();
        let session = session(connector);
        let mut states = session.subscribe();
        let task = tokio::spawn(async move {
            session.run_with_identity(&request(), identity()).await
        });

        states.changed().await.unwrap();
        assert_eq!(*states.borrow_and_update(), SessionState::Connecting);

        handle.push(TransportEvent::Open);
        states.changed().await.unwrap();
        assert_eq!(*states.borrow_and_update(), SessionState::AwaitingAudio);

        handle.push(audio_frame(b"a"));
        handle.push(turn_end());
        task.await.unwrap().unwrap();
        assert_eq!(*states.borrow(), SessionState::Resolved);
    }

    #[tokio::test]
    async fn test_timeout_transitions() {
        let (connector, handle) = mock::pair();
        handle.push(TransportEvent::Open);

        let session = SynthesisSession::new(
            Arc::new(SessionConfig {
                timeout: Duration::from_millis(50),
                ..(*config()).clone()
            }),
            connector,
        );
        let mut transitions = session.transitions();
        let err = session.run_with_identity(&request(), identity()).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(
            drain_transitions(&mut transitions),
            vec![
                SessionState::Connecting,
                SessionState::AwaitingAudio,
                SessionState::Failed,
            ]
        );
    }

    #[tokio::test]
    async fn test_sends_config_then_markup() {
        let (connector, handle) = mock::pair();
        script(&handle, vec![TransportEvent::Open, audio_frame(b"a"), turn_end()]);

        let id = identity();
        session(connector)
            .run_with_identity(&request(), id.clone())
            .await
            .unwrap();

        let sent = handle.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].starts_with(&format!("X-Timestamp:{}\r\n", id.timestamp)));
        assert!(sent[0].contains("Path:speech.config"));
        assert!(sent[1].starts_with(&format!("X-RequestId:{}\r\n", id.id)));
        assert!(sent[1].contains("Path:ssml"));
        assert!(sent[1].contains("<voice name=\"ja-JP-NanamiNeural\">"));
        assert!(sent[1].contains("こんにちは"));
    }

    #[tokio::test]
    async fn test_turn_end_without_audio_fails() {
        let (connector, handle) = mock::pair();
        script(&handle, vec![TransportEvent::Open, turn_end()]);

        let session = session(connector);
        let states = session.subscribe();
        let err = session
            .run_with_identity(&request(), identity())
            .await
            .unwrap_err();

        assert!(err.is_empty_result());
        assert_eq!(*states.borrow(), SessionState::Failed);
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_closes_once() {
        let (connector, handle) = mock::pair();
        script(&handle, vec![TransportEvent::Open]);

        let err = session(connector)
            .run_with_identity(&request(), identity())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout(d) if d == DEFAULT_TIMEOUT));
        assert_eq!(handle.close_count(), 1);
        assert_eq!(handle.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_while_connecting() {
        let (connector, handle) = mock::pair();

        let err = session(connector)
            .run_with_identity(&request(), identity())
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(handle.sent().is_empty());
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test]
    async fn test_error_then_close_fails_with_error() {
        let (connector, handle) = mock::pair();
        script(
            &handle,
            vec![
                TransportEvent::Open,
                audio_frame(b"partial"),
                TransportEvent::Error("connection reset".to_string()),
                close(),
            ],
        );

        let session = session(connector);
        let states = session.subscribe();
        let err = session
            .run_with_identity(&request(), identity())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(ref m) if m == "connection reset"));
        assert_eq!(*states.borrow(), SessionState::Failed);
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test]
    async fn test_close_before_turn_end() {
        let (connector, handle) = mock::pair();
        script(
            &handle,
            vec![TransportEvent::Open, audio_frame(b"one"), audio_frame(b"two"), close()],
        );

        let err = session(connector)
            .run_with_identity(&request(), identity())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ConnectionClosed { chunks: 2 }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_close_before_open() {
        let (connector, handle) = mock::pair();
        script(&handle, vec![close()]);

        let err = session(connector)
            .run_with_identity(&request(), identity())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ConnectionClosed { chunks: 0 }));
        assert!(handle.sent().is_empty());
    }

    #[tokio::test]
    async fn test_transport_dropped() {
        let (connector, handle) = mock::pair();
        script(&handle, vec![TransportEvent::Open]);
        let MockHandle { events, .. } = handle;
        drop(events);

        let err = session(connector)
            .run_with_identity(&request(), identity())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ConnectionClosed { chunks: 0 }));
    }

    #[tokio::test]
    async fn test_non_audio_frames_skipped() {
        let (connector, handle) = mock::pair();

        let header = b"Path:turn.start\r\n";
        let mut metadata = (header.len() as u16).to_be_bytes().to_vec();
        metadata.extend_from_slice(header);
        metadata.extend_from_slice(b"{}");

        script(
            &handle,
            vec![
                TransportEvent::Open,
                TransportEvent::Binary(Bytes::from(metadata)),
                TransportEvent::Binary(Bytes::from_static(&[0x00])),
                audio_frame(b"kept"),
                turn_end(),
            ],
        );

        let result = session(connector)
            .run_with_identity(&request(), identity())
            .await
            .unwrap();
        assert_eq!(result.audio, Bytes::from_static(b"kept"));
    }

    #[tokio::test]
    async fn test_fallback_frame_kept_whole() {
        let (connector, handle) = mock::pair();

        let mut overflow = vec![0x11; 150];
        overflow[0] = 0xFF;
        overflow[1] = 0xFF;
        let overflow = Bytes::from(overflow);

        script(
            &handle,
            vec![
                TransportEvent::Open,
                TransportEvent::Binary(overflow.clone()),
                turn_end(),
            ],
        );

        let result = session(connector)
            .run_with_identity(&request(), identity())
            .await
            .unwrap();
        assert_eq!(result.audio, overflow);
    }

    #[tokio::test]
    async fn test_send_failure() {
        let (connector, handle) = mock::failing_send_pair();
        script(&handle, vec![TransportEvent::Open, audio_frame(b"late"), turn_end()]);

        let err = session(connector)
            .run_with_identity(&request(), identity())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_never_connects() {
        let (connector, handle) = mock::pair();

        let session = session(connector);
        let states = session.subscribe();
        let err = session
            .run_with_identity(&SynthesisRequest::new("  ", "ja-JP-NanamiNeural"), identity())
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(handle.urls().is_empty());
        assert_eq!(*states.borrow(), SessionState::Idle);
    }

    #[test]
    fn test_connection_url() {
        let url = config().connection_url("0123abcd-0000-4000-8000-000000000000");
        assert_eq!(
            url.as_str(),
            "wss://speech.example.com/tts/v1?TrustedClientToken=TOKEN&ConnectionId=0123abcd-0000-4000-8000-000000000000"
        );
    }

    #[tokio::test]
    async fn test_connector_gets_session_verbosity() {
        let (connector, handle) = mock::pair();
        script(&handle, vec![TransportEvent::Open, audio_frame(b"a"), turn_end()]);

        let local = SessionConfig::new(Url::parse("ws://localhost:8080/v1").unwrap(), "t");
        SynthesisSession::new(Arc::new(local), connector)
            .run_with_identity(&request(), identity())
            .await
            .unwrap();

        assert_eq!(handle.verbosities(), vec![Verbosity::Verbose]);
    }

    #[test]
    fn test_verbosity_follows_endpoint() {
        let local = SessionConfig::new(Url::parse("ws://127.0.0.1:8080/v1").unwrap(), "t");
        assert!(local.verbosity.is_verbose());
        assert!(!config().verbosity.is_verbose());
    }
}
