//! Read-aloud synthesis client.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::{
    error::{Error, Result},
    frame::FrameTolerance,
    message::{DEFAULT_OUTPUT_FORMAT, MessageBuilder},
    session::{DEFAULT_TIMEOUT, SessionConfig, SynthesisSession},
    ssml::SsmlOptions,
    transport::{Connector, WsConnector},
    types::{SynthesisRequest, SynthesisResult, Verbosity},
    voice::DEFAULT_VOICE,
};

/// Default read-aloud WebSocket endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "wss://speech.platform.bing.com/consumer/speech/synthesize/readaloud/edge/v1";

/// Public client token of the read-aloud service.
pub const DEFAULT_TRUSTED_CLIENT_TOKEN: &str = "6A5AA1D4EAFF4E9FB37E23D68491D6F4";

/// Read-aloud synthesis client.
///
/// Every synthesis runs on its own connection; a client can be shared and
/// used for concurrent requests.
///
/// # Example
///
/// ```rust,no_run
/// use readaloud::{Client, SynthesisRequest};
///
/// # async fn demo() -> readaloud::Result<()> {
/// let client = Client::new()?;
/// let result = client
///     .synthesize(&SynthesisRequest::with_default_voice("こんにちは"))
///     .await?;
/// std::fs::write("hello.mp3", &result.audio).ok();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    config: Arc<SessionConfig>,
    connector: Arc<dyn Connector>,
}

impl Client {
    /// Creates a client with default settings.
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    /// Creates a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    /// Returns the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Creates an idle session.
    ///
    /// Use this to observe state changes with [`SynthesisSession::subscribe`]
    /// before running it.
    pub fn session(&self) -> SynthesisSession {
        SynthesisSession::new(self.config.clone(), self.connector.clone())
    }

    /// Synthesizes `request` into audio.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult> {
        self.session().run(request).await
    }

    /// Synthesizes `text` with `voice`, or the default voice.
    pub async fn speak(&self, text: &str, voice: Option<&str>) -> Result<SynthesisResult> {
        let request = SynthesisRequest::new(text, voice.unwrap_or(DEFAULT_VOICE));
        self.synthesize(&request).await
    }
}

/// Builder for creating a read-aloud client.
pub struct ClientBuilder {
    endpoint: String,
    trusted_client_token: String,
    timeout: Duration,
    verbosity: Option<Verbosity>,
    tolerance: FrameTolerance,
    output_format: String,
    ssml: SsmlOptions,
    connector: Option<Arc<dyn Connector>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            trusted_client_token: DEFAULT_TRUSTED_CLIENT_TOKEN.to_string(),
            timeout: DEFAULT_TIMEOUT,
            verbosity: None,
            tolerance: FrameTolerance::default(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            ssml: SsmlOptions::default(),
            connector: None,
        }
    }

    /// Sets the WebSocket endpoint (`ws://` or `wss://`).
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Sets the `TrustedClientToken` query parameter.
    pub fn trusted_client_token(mut self, token: impl Into<String>) -> Self {
        self.trusted_client_token = token.into();
        self
    }

    /// Sets the session deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the verbosity. Detected from the endpoint when unset.
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    /// Sets the binary-frame fallback thresholds.
    pub fn frame_tolerance(mut self, tolerance: FrameTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the requested audio output format.
    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    /// Sets the markup language.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.ssml.language = language.into();
        self
    }

    /// Sets the prosody rate and pitch.
    pub fn prosody(mut self, rate: impl Into<String>, pitch: impl Into<String>) -> Self {
        self.ssml.rate = rate.into();
        self.ssml.pitch = pitch.into();
        self
    }

    /// Sets a custom connector.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<Client> {
        let endpoint = Url::parse(&self.endpoint)?;
        match endpoint.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::Config(format!(
                    "endpoint scheme must be ws or wss, got {other}"
                )));
            }
        }
        if endpoint.query().is_some() {
            return Err(Error::Config(
                "endpoint must not carry query parameters".to_string(),
            ));
        }
        if self.trusted_client_token.is_empty() {
            return Err(Error::Config(
                "trusted_client_token must be non-empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be positive".to_string()));
        }
        if self.output_format.is_empty() {
            return Err(Error::Config("output_format must be non-empty".to_string()));
        }

        let mut config = SessionConfig::new(endpoint, self.trusted_client_token);
        config.timeout = self.timeout;
        if let Some(verbosity) = self.verbosity {
            config.verbosity = verbosity;
        }
        config.tolerance = self.tolerance;
        config.messages = MessageBuilder::new()
            .output_format(self.output_format)
            .ssml_options(self.ssml);

        Ok(Client {
            config: Arc::new(config),
            connector: self.connector.unwrap_or_else(|| Arc::new(WsConnector)),
        })
    }
}
