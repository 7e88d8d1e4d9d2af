//! Duplex message transport used by synthesis sessions.
//!
//! A [`Connector`] returns a [`Transport`] immediately; the connection is
//! established in the background and reported as [`TransportEvent::Open`],
//! like a browser WebSocket. Everything the session learns about the
//! connection arrives as an event.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error};
use url::Url;

use crate::error::{Error, Result};
use crate::types::Verbosity;

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and can send.
    Open,
    /// A text frame.
    Text(String),
    /// A binary frame.
    Binary(Bytes),
    /// The connection failed.
    Error(String),
    /// The connection closed.
    Close { code: Option<u16>, reason: String },
}

/// A duplex, message-oriented connection.
#[async_trait]
pub trait Transport: Send {
    /// Sends a text frame.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Waits for the next event. `None` means the transport is gone.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Closes the connection.
    async fn close(&mut self);
}

/// Opens transports.
pub trait Connector: Send + Sync {
    /// Starts connecting to `url`. Connection diagnostics follow `verbosity`.
    fn connect(&self, url: &Url, verbosity: Verbosity) -> Box<dyn Transport>;
}

// ================== WebSocket ==================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CHANNEL_CAPACITY: usize = 100;

/// Connects over WebSocket with tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, url: &Url, verbosity: Verbosity) -> Box<dyn Transport> {
        Box::new(WsTransport::spawn(url.clone(), verbosity))
    }
}

/// WebSocket transport backed by a connection task.
pub struct WsTransport {
    event_rx: mpsc::Receiver<TransportEvent>,
    write_tx: mpsc::Sender<Message>,
    closed: bool,
}

impl WsTransport {
    /// Spawns the connection task for `url`.
    pub fn spawn(url: Url, verbosity: Verbosity) -> Self {
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (write_tx, write_rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(connection_task(url, verbosity, event_tx, write_rx));

        Self {
            event_rx,
            write_tx,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.write_tx
            .send(Message::Text(text.into()))
            .await
            .map_err(|_| Error::Transport("connection is closed".to_string()))
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.event_rx.recv().await
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.write_tx.send(Message::Close(None)).await;
    }
}

async fn connection_task(
    url: Url,
    verbosity: Verbosity,
    events: mpsc::Sender<TransportEvent>,
    mut write_rx: mpsc::Receiver<Message>,
) {
    let verbose = verbosity.is_verbose();
    if verbose {
        debug!("Connecting to: {}", url.host_str().unwrap_or_default());
    }

    let ws = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((ws, _response)) => ws,
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string())).await;
                return;
            }
        },
        _ = wait_for_close(&mut write_rx, verbose) => {
            let _ = events
                .send(TransportEvent::Close {
                    code: None,
                    reason: "closed before open".to_string(),
                })
                .await;
            return;
        }
    };

    if events.send(TransportEvent::Open).await.is_err() {
        return;
    }

    let (write, read) = ws.split();
    tokio::spawn(write_loop(write, write_rx, verbose));
    read_loop(read, events).await;
}

// Frames queued before the connection opens cannot be delivered.
async fn wait_for_close(rx: &mut mpsc::Receiver<Message>, verbose: bool) {
    loop {
        match rx.recv().await {
            Some(Message::Close(_)) | None => return,
            Some(_) if verbose => debug!("dropping frame queued before open"),
            Some(_) => {}
        }
    }
}

async fn write_loop(
    mut write: SplitSink<WsStream, Message>,
    mut rx: mpsc::Receiver<Message>,
    verbose: bool,
) {
    while let Some(msg) = rx.recv().await {
        if let Message::Close(_) = msg {
            let _ = write.close().await;
            break;
        }
        if let Err(e) = write.send(msg).await {
            if verbose {
                error!("Write error: {}", e);
            }
            break;
        }
    }
}

async fn read_loop(mut read: SplitStream<WsStream>, events: mpsc::Sender<TransportEvent>) {
    while let Some(result) = read.next().await {
        let event = match result {
            Ok(Message::Text(text)) => TransportEvent::Text(text.as_str().to_string()),
            Ok(Message::Binary(data)) => TransportEvent::Binary(data),
            Ok(Message::Close(frame)) => {
                let (code, reason) = match frame {
                    Some(f) => (Some(u16::from(f.code)), f.reason.as_str().to_string()),
                    None => (None, String::new()),
                };
                let _ = events.send(TransportEvent::Close { code, reason }).await;
                return;
            }
            Ok(_) => continue,
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string())).await;
                return;
            }
        };
        if events.send(event).await.is_err() {
            return;
        }
    }

    let _ = events
        .send(TransportEvent::Close {
            code: None,
            reason: String::new(),
        })
        .await;
}

// ================== Test double ==================

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Test-side handle of a scripted transport.
    pub struct MockHandle {
        pub events: mpsc::UnboundedSender<TransportEvent>,
        pub sent: Arc<Mutex<Vec<String>>>,
        pub urls: Arc<Mutex<Vec<String>>>,
        verbosities: Arc<Mutex<Vec<Verbosity>>>,
        closes: Arc<AtomicUsize>,
    }

    impl MockHandle {
        pub fn push(&self, event: TransportEvent) {
            let _ = self.events.send(event);
        }

        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        pub fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }

        pub fn verbosities(&self) -> Vec<Verbosity> {
            self.verbosities.lock().unwrap().clone()
        }

        pub fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    /// Connector handing out one scripted transport.
    pub struct MockConnector {
        transport: Mutex<Option<MockTransport>>,
        urls: Arc<Mutex<Vec<String>>>,
        verbosities: Arc<Mutex<Vec<Verbosity>>>,
    }

    impl Connector for MockConnector {
        fn connect(&self, url: &Url, verbosity: Verbosity) -> Box<dyn Transport> {
            self.urls.lock().unwrap().push(url.to_string());
            self.verbosities.lock().unwrap().push(verbosity);
            let transport = self
                .transport
                .lock()
                .unwrap()
                .take()
                .expect("mock connector used twice");
            Box::new(transport)
        }
    }

    pub struct MockTransport {
        events: mpsc::UnboundedReceiver<TransportEvent>,
        sent: Arc<Mutex<Vec<String>>>,
        closes: Arc<AtomicUsize>,
        fail_send: bool,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, text: String) -> Result<()> {
            if self.fail_send {
                return Err(Error::Transport("send failed".to_string()));
            }
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn next_event(&mut self) -> Option<TransportEvent> {
            self.events.recv().await
        }

        async fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn pair() -> (Arc<MockConnector>, MockHandle) {
        build(false)
    }

    pub fn failing_send_pair() -> (Arc<MockConnector>, MockHandle) {
        build(true)
    }

    fn build(fail_send: bool) -> (Arc<MockConnector>, MockHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let urls = Arc::new(Mutex::new(Vec::new()));
        let verbosities = Arc::new(Mutex::new(Vec::new()));
        let closes = Arc::new(AtomicUsize::new(0));

        let connector = Arc::new(MockConnector {
            transport: Mutex::new(Some(MockTransport {
                events: rx,
                sent: sent.clone(),
                closes: closes.clone(),
                fail_send,
            })),
            urls: urls.clone(),
            verbosities: verbosities.clone(),
        });

        let handle = MockHandle {
            events: tx,
            sent,
            urls,
            verbosities,
            closes,
        };

        (connector, handle)
    }
}
