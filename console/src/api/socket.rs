//! Socket connections for the log/exec stream

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Close code of a normal closure
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code of a close frame that carried no status
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Close code reported when the connection dropped without a close frame
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Lifecycle and data events of a socket connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    Message(String),
    Error(String),
    Closed { code: u16, reason: String },
}

#[derive(Debug)]
enum SocketCommand {
    Send(String),
    Close,
}

/// Client side of a socket connection
///
/// Dropping the connection closes it.
#[derive(Debug)]
pub struct SocketConnection {
    commands: mpsc::UnboundedSender<SocketCommand>,
    events: mpsc::UnboundedReceiver<SocketEvent>,
    open: Arc<AtomicBool>,
}

/// Transport side of a socket connection, driven by a connector
#[derive(Debug)]
pub struct SocketPeer {
    commands: mpsc::UnboundedReceiver<SocketCommand>,
    events: mpsc::UnboundedSender<SocketEvent>,
    open: Arc<AtomicBool>,
    pending: VecDeque<String>,
    released: bool,
}

impl SocketConnection {
    /// Create a connected pair of handles
    pub fn pair() -> (SocketConnection, SocketPeer) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));

        (
            SocketConnection {
                commands: command_tx,
                events: event_rx,
                open: open.clone(),
            },
            SocketPeer {
                commands: command_rx,
                events: event_tx,
                open,
                pending: VecDeque::new(),
                released: false,
            },
        )
    }

    /// Whether the transport reports the connection open
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Queue a text frame. Fails without touching the transport when not open.
    pub fn send_text(&self, text: String) -> Result<()> {
        if !self.is_open() {
            return Err(Error::StreamNotConnected);
        }
        self.commands
            .send(SocketCommand::Send(text))
            .map_err(|_| Error::StreamNotConnected)
    }

    /// Request a normal closure
    pub fn close(&self) {
        let _ = self.commands.send(SocketCommand::Close);
    }

    /// Next event, or `None` once the transport is gone
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        self.events.recv().await
    }
}

impl Drop for SocketConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl SocketPeer {
    pub fn opened(&self) {
        self.open.store(true, Ordering::SeqCst);
        let _ = self.events.send(SocketEvent::Opened);
    }

    pub fn message(&self, text: impl Into<String>) {
        let _ = self.events.send(SocketEvent::Message(text.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        let _ = self.events.send(SocketEvent::Error(message.into()));
    }

    pub fn closed(&self, code: u16, reason: impl Into<String>) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.events.send(SocketEvent::Closed {
            code,
            reason: reason.into(),
        });
    }

    /// Next frame queued by the client. `None` when the client closed or dropped the connection.
    pub async fn next_outbound(&mut self) -> Option<String> {
        if let Some(text) = self.pending.pop_front() {
            return Some(text);
        }
        if self.released {
            return None;
        }
        match self.commands.recv().await {
            Some(SocketCommand::Send(text)) => Some(text),
            Some(SocketCommand::Close) | None => {
                self.released = true;
                None
            }
        }
    }

    /// Next queued frame without waiting
    pub fn try_outbound(&mut self) -> Option<String> {
        self.drain();
        self.pending.pop_front()
    }

    /// Whether the client asked to close or dropped its handle
    pub fn is_released(&mut self) -> bool {
        self.drain();
        self.released
    }

    fn drain(&mut self) {
        while !self.released {
            match self.commands.try_recv() {
                Ok(SocketCommand::Send(text)) => self.pending.push_back(text),
                Ok(SocketCommand::Close) | Err(TryRecvError::Disconnected) => self.released = true,
                Err(TryRecvError::Empty) => break,
            }
        }
    }

    /// Whether the client side is gone
    pub fn is_client_closed(&self) -> bool {
        self.events.is_closed()
    }
}

/// Opens socket connections
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocketConnector: Send + Sync {
    /// Start connecting. The handshake outcome arrives as `Opened` or `Error` + `Closed`.
    async fn connect(&self, url: &str) -> Result<SocketConnection>;
}

/// WebSocket connector over tokio-tungstenite
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SocketConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<SocketConnection> {
        let parsed = reqwest::Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(Error::InvalidUrl(format!(
                "unsupported socket scheme: {}",
                parsed.scheme()
            )));
        }

        let (connection, peer) = SocketConnection::pair();
        tokio::spawn(drive(parsed.to_string(), peer));
        Ok(connection)
    }
}

/// Pump frames between the WebSocket and the peer until either side closes
async fn drive(url: String, mut peer: SocketPeer) {
    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            warn!("WebSocket connect failed: {}", e);
            peer.error(e.to_string());
            peer.closed(CLOSE_ABNORMAL, "");
            return;
        }
    };
    info!("WebSocket connected");
    peer.opened();

    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            outbound = peer.next_outbound() => match outbound {
                Some(text) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        warn!("WebSocket send failed: {}", e);
                        peer.error(e.to_string());
                        peer.closed(CLOSE_ABNORMAL, "");
                        break;
                    }
                }
                None => {
                    debug!("Closing WebSocket on client request");
                    let _ = write
                        .send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "".into(),
                        })))
                        .await;
                    peer.closed(CLOSE_NORMAL, "closed by client");
                    break;
                }
            },
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => peer.message(text.as_str()),
                Some(Ok(Message::Binary(data))) => peer.message(String::from_utf8_lossy(&data)),
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = close_details(frame);
                    info!("WebSocket closed by server: {} {}", code, reason);
                    peer.closed(code, reason);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    peer.error(e.to_string());
                    peer.closed(CLOSE_ABNORMAL, "");
                    break;
                }
                None => {
                    peer.closed(CLOSE_ABNORMAL, "connection dropped");
                    break;
                }
            },
        }
    }
}

fn close_details(frame: Option<CloseFrame>) -> (u16, String) {
    frame
        .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
        .unwrap_or((CLOSE_NO_STATUS, String::new()))
}
