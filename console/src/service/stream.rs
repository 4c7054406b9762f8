//! Live log/exec stream for a container detail view

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::socket::{SocketConnection, SocketEvent, CLOSE_NORMAL};
use crate::api::wire::{InboundFrame, OutboundFrame};
use crate::api::ApiClient;
use crate::error::{Error, Result};

/// Entry appended when the stream opens
pub const CONNECTED_ENTRY: &str = "Connected to log stream";

/// Entry appended when the stream closes
pub const DISCONNECTED_ENTRY: &str = "Disconnected from log stream";

const CONNECT_FAILED: &str = "Failed to connect to logs stream";
const CONNECTION_ERROR: &str = "WebSocket connection error";
const NOT_CONNECTED: &str = "Not connected to logs stream";

struct ActiveConnection {
    id: Uuid,
    container_id: String,
    socket: SocketConnection,
}

/// Stream client holding at most one connection, bound to one container
///
/// Opening a connection always drops the previous one first. Dropping the
/// client closes its connection.
pub struct LiveStream {
    api: Arc<ApiClient>,
    container_id: Option<String>,
    connection: Option<ActiveConnection>,
    connected: bool,
    error: Option<String>,
    logs: Vec<String>,
}

impl LiveStream {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            container_id: None,
            connection: None,
            connected: false,
            error: None,
            logs: Vec::new(),
        }
    }

    /// Container the stream is bound to
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether a connection object is held, open or not
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Visible error, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Bind to a container and open its stream
    ///
    /// Switching containers tears the old connection down and starts a fresh buffer.
    pub async fn open(&mut self, container_id: &str) -> bool {
        if self.container_id.as_deref() != Some(container_id) {
            self.close();
            self.logs.clear();
            self.error = None;
            self.container_id = Some(container_id.to_string());
        }
        self.connect().await
    }

    /// Reopen after a disconnect. Does nothing while connected.
    pub async fn reconnect(&mut self) -> bool {
        if self.connected || self.container_id.is_none() {
            return false;
        }
        self.connect().await
    }

    async fn connect(&mut self) -> bool {
        self.close();
        let Some(container_id) = self.container_id.clone() else {
            return false;
        };

        match self.api.open_log_stream(&container_id).await {
            Ok(Some(socket)) => {
                let id = Uuid::new_v4();
                debug!("Stream {} bound to container {}", id, container_id);
                self.connection = Some(ActiveConnection {
                    id,
                    container_id,
                    socket,
                });
                true
            }
            Ok(None) => {
                self.error = Some(CONNECT_FAILED.to_string());
                false
            }
            Err(e) => {
                warn!("Failed to open log stream for {}: {}", container_id, e);
                self.error = Some(CONNECT_FAILED.to_string());
                false
            }
        }
    }

    /// Close the current connection, if any
    pub fn close(&mut self) {
        if let Some(active) = self.connection.take() {
            info!(
                "Closing stream {} for container {}",
                active.id, active.container_id
            );
            active.socket.close();
        }
        self.connected = false;
    }

    /// Wait for the next socket event and apply it
    ///
    /// Returns the event, or `None` when there is no connection or it has ended.
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        let active = self.connection.as_mut()?;
        match active.socket.next_event().await {
            Some(event) => {
                self.apply(event.clone());
                Some(event)
            }
            None => {
                self.connection = None;
                self.connected = false;
                None
            }
        }
    }

    /// Apply one socket event to the stream state
    pub fn apply(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Opened => {
                self.error = None;
                self.connected = true;
                self.logs.push(CONNECTED_ENTRY.to_string());
            }
            SocketEvent::Message(text) => {
                let frame = InboundFrame::decode(&text);
                if let InboundFrame::Error(message) = &frame {
                    self.error = Some(message.clone());
                }
                self.logs.push(frame.display());
            }
            SocketEvent::Error(message) => {
                warn!("Log stream error: {}", message);
                self.connected = false;
                self.error = Some(CONNECTION_ERROR.to_string());
            }
            SocketEvent::Closed { code, reason } => {
                self.connected = false;
                self.connection = None;
                self.logs.push(DISCONNECTED_ENTRY.to_string());
                if code != CLOSE_NORMAL {
                    warn!("Log stream closed unexpectedly: {} {}", code, reason);
                    self.error = Some(format!("Log stream closed unexpectedly (code {})", code));
                } else {
                    info!("Log stream closed");
                }
            }
        }
    }

    /// Send a command to the container
    ///
    /// Empty commands are ignored. While disconnected nothing is sent and a
    /// single error entry is appended.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        let command = command.trim();
        if command.is_empty() {
            return Ok(());
        }

        let sent = match (&self.connection, self.connected) {
            (Some(active), true) => {
                let frame = OutboundFrame::Command {
                    container_id: active.container_id.clone(),
                    command: command.to_string(),
                };
                active.socket.send_text(frame.encode()?)
            }
            _ => Err(Error::StreamNotConnected),
        };

        match sent {
            Ok(()) => {
                self.logs.push(format!("$ {}", command));
                Ok(())
            }
            Err(e) => {
                warn!("Command not sent: {}", e);
                self.logs.push(format!("ERROR: {}", NOT_CONNECTED));
                Err(e)
            }
        }
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.close();
    }
}
