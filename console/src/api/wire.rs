//! Wire formats: REST payloads and stream frames

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::container::{ContainerInfo, ContainerPort};
use crate::domain::user::User;

/// Container record as sent by the backend. Optional fields are normalized on conversion.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ports: Option<Vec<ContainerPort>>,
    #[serde(default)]
    pub created: Option<serde_json::Value>,
    #[serde(default)]
    pub tty: Option<bool>,
    #[serde(default)]
    pub open_stdin: Option<bool>,
}

impl From<ContainerDto> for ContainerInfo {
    fn from(dto: ContainerDto) -> Self {
        ContainerInfo {
            id: dto.id,
            name: dto.name,
            image: dto.image,
            state: dto.state,
            status: dto.status,
            ports: dto.ports.unwrap_or_default(),
            created: dto.created.map(created_string).unwrap_or_default(),
            tty: dto.tty.unwrap_or(false),
            open_stdin: dto.open_stdin.unwrap_or(false),
        }
    }
}

/// Strings pass through; unix seconds become RFC 3339
fn created_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| n.to_string()),
        _ => String::new(),
    }
}

/// Sign-in exchange request
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SignInRequest {
    Code { code: String },
    IdToken { token: String },
}

/// Sign-in exchange response. Both fields must be present.
#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// Token verification request
#[derive(Debug, Serialize)]
pub struct VerifyTokenRequest<'a> {
    pub token: &'a str,
}

/// Backend error body, when one is sent
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(alias = "error")]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum KnownFrame {
    Logs { log: String },
    CommandOutput { output: String },
    Error { message: String },
}

/// Inbound stream frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Logs(String),
    CommandOutput(String),
    Error(String),
    /// Anything that is not one of the shapes above, kept verbatim
    Raw(String),
}

impl InboundFrame {
    pub fn decode(text: &str) -> Self {
        match serde_json::from_str::<KnownFrame>(text) {
            Ok(KnownFrame::Logs { log }) => InboundFrame::Logs(log),
            Ok(KnownFrame::CommandOutput { output }) => InboundFrame::CommandOutput(output),
            Ok(KnownFrame::Error { message }) => InboundFrame::Error(message),
            Err(_) => InboundFrame::Raw(text.to_string()),
        }
    }

    /// Entry appended to the log buffer
    pub fn display(&self) -> String {
        match self {
            InboundFrame::Logs(log) => log.clone(),
            InboundFrame::CommandOutput(output) => format!("> {}", output),
            InboundFrame::Error(message) => format!("ERROR: {}", message),
            InboundFrame::Raw(text) => text.clone(),
        }
    }
}

/// Outbound stream frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundFrame {
    #[serde(rename_all = "camelCase")]
    Command {
        container_id: String,
        command: String,
    },
}

impl OutboundFrame {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
