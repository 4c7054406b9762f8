//! Container domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime state value reported for running containers
pub const STATE_RUNNING: &str = "running";

/// Runtime state value reported for stopped containers
pub const STATE_EXITED: &str = "exited";

/// Port binding of a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub private_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_port: Option<u16>,
    #[serde(rename = "type")]
    pub protocol: String,
}

impl std::fmt::Display for ContainerPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.public_port {
            Some(public) => write!(f, "{}:{} ({})", self.private_port, public, self.protocol),
            None => write!(f, "{}:N/A ({})", self.private_port, self.protocol),
        }
    }
}

/// Container summary, an immutable snapshot of the last successful fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    /// Unique identifier
    pub id: String,

    /// Container name
    pub name: String,

    /// Image the container runs
    pub image: String,

    /// Runtime state ("running", "exited", ...)
    pub state: String,

    /// Human-readable status line
    pub status: String,

    /// Port bindings
    pub ports: Vec<ContainerPort>,

    /// Creation timestamp as reported by the backend
    pub created: String,

    /// Whether a TTY is allocated
    pub tty: bool,

    /// Whether stdin is kept open
    pub open_stdin: bool,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state == STATE_RUNNING
    }

    /// Actions offered for the current state
    pub fn available_actions(&self) -> &'static [ContainerAction] {
        if self.is_running() {
            &[ContainerAction::Stop, ContainerAction::Restart]
        } else {
            &[ContainerAction::Start]
        }
    }

    pub fn offers(&self, action: ContainerAction) -> bool {
        self.available_actions().contains(&action)
    }

    pub fn indicator(&self) -> StateIndicator {
        match self.state.as_str() {
            STATE_RUNNING => StateIndicator::Healthy,
            STATE_EXITED => StateIndicator::Failed,
            _ => StateIndicator::Neutral,
        }
    }

    /// Creation time, when the backend reports RFC 3339
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Visual state marker for a container row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateIndicator {
    Healthy,
    Failed,
    Neutral,
}

/// Mutating container action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerAction {
    Start,
    Stop,
    Restart,
}

impl ContainerAction {
    /// Path segment of the action endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerAction::Start => "start",
            ContainerAction::Stop => "stop",
            ContainerAction::Restart => "restart",
        }
    }
}

impl std::fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
