//! Container list and detail view-models
//!
//! Both views show the last successful fetch. Every mutating action is
//! followed by a re-fetch; nothing is patched locally.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use crate::api::socket::SocketEvent;
use crate::api::ApiClient;
use crate::domain::container::{ContainerAction, ContainerInfo};
use crate::error::{Error, Result};
use crate::service::stream::LiveStream;

const FETCH_LIST_FAILED: &str = "Failed to fetch containers";
const FETCH_DETAILS_FAILED: &str = "Failed to fetch container details";

fn action_failed(action: ContainerAction) -> String {
    format!("Failed to {} container", action)
}

/// Dashboard state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerListState {
    pub containers: Vec<ContainerInfo>,
    pub loading: bool,
    pub error: Option<String>,
    /// Action currently running, with the container it targets
    pub performing: Option<(ContainerAction, String)>,
}

/// Clears an in-flight marker however the action ends, cancellation included
struct InFlight<T> {
    state: Arc<watch::Sender<T>>,
    clear: fn(&mut T),
}

impl<T> Drop for InFlight<T> {
    fn drop(&mut self) {
        self.state.send_modify(self.clear);
    }
}

/// Container list view-model
pub struct ContainerListView {
    api: Arc<ApiClient>,
    state: Arc<watch::Sender<ContainerListState>>,
}

impl ContainerListView {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(ContainerListState {
            loading: true,
            ..Default::default()
        });
        Self {
            api,
            state: Arc::new(state),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ContainerListState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ContainerListState> {
        self.state.subscribe()
    }

    /// Re-fetch the full list
    pub async fn refresh(&self) -> bool {
        self.state.send_modify(|s| s.loading = true);
        let result = self.api.list_containers().await;
        let ok = result.is_ok();
        self.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(containers) => {
                    s.containers = containers;
                    s.error = None;
                }
                Err(e) => {
                    error!("Error fetching containers: {}", e);
                    s.error = Some(FETCH_LIST_FAILED.to_string());
                }
            }
        });
        ok
    }

    /// Run an action on a container, then re-fetch the list
    pub async fn perform(&self, id: &str, action: ContainerAction) -> bool {
        self.state
            .send_modify(|s| s.performing = Some((action, id.to_string())));
        let _in_flight = InFlight {
            state: self.state.clone(),
            clear: |s: &mut ContainerListState| s.performing = None,
        };

        if let Err(e) = self.api.container_action(id, action).await {
            error!("Error running {} on container {}: {}", action, id, e);
            self.state
                .send_modify(|s| s.error = Some(action_failed(action)));
            return false;
        }
        info!("Container {} {} requested", id, action);
        self.refresh().await
    }

    /// Whether the button for `action` on `container` is shown and enabled
    pub fn is_action_enabled(&self, container: &ContainerInfo, action: ContainerAction) -> bool {
        if !container.offers(action) {
            return false;
        }
        match &self.state.borrow().performing {
            Some((running, id)) => !(*running == action && *id == container.id),
            None => true,
        }
    }

    pub fn dismiss_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }
}

/// Container detail view-model: summary plus its live stream
pub struct ContainerDetailView {
    api: Arc<ApiClient>,
    container_id: String,
    container: Option<ContainerInfo>,
    loading: bool,
    error: Option<String>,
    performing: Arc<watch::Sender<Option<ContainerAction>>>,
    stream: LiveStream,
}

impl ContainerDetailView {
    pub fn new(api: Arc<ApiClient>, container_id: impl Into<String>) -> Self {
        let stream = LiveStream::new(api.clone());
        Self {
            api,
            container_id: container_id.into(),
            container: None,
            loading: true,
            error: None,
            performing: Arc::new(watch::channel(None).0),
            stream,
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Last fetched summary; `None` before the first fetch or when not found
    pub fn container(&self) -> Option<&ContainerInfo> {
        self.container.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Visible error: the view's own, else the stream's
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().or_else(|| self.stream.error())
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
        self.stream.dismiss_error();
    }

    pub fn performing(&self) -> Option<ContainerAction> {
        *self.performing.borrow()
    }

    pub fn stream(&self) -> &LiveStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut LiveStream {
        &mut self.stream
    }

    /// Load the summary and open the stream
    pub async fn open(&mut self) -> bool {
        let loaded = self.refresh().await;
        let id = self.container_id.clone();
        self.stream.open(&id).await;
        loaded
    }

    /// Switch to another container, tearing down the old stream
    pub async fn navigate_to(&mut self, container_id: &str) -> bool {
        if container_id == self.container_id && self.stream.has_connection() {
            return true;
        }
        info!("Switching detail view to container {}", container_id);
        self.stream.close();
        self.container_id = container_id.to_string();
        self.container = None;
        self.error = None;
        self.open().await
    }

    /// Re-fetch the summary
    pub async fn refresh(&mut self) -> bool {
        self.loading = true;
        let result = self.api.get_container(&self.container_id).await;
        self.loading = false;
        match result {
            Ok(container) => {
                self.container = Some(container);
                self.error = None;
                true
            }
            Err(e) => {
                error!("Error fetching container {}: {}", self.container_id, e);
                if matches!(e, Error::ContainerNotFound(_)) {
                    self.container = None;
                }
                self.error = Some(FETCH_DETAILS_FAILED.to_string());
                false
            }
        }
    }

    /// Run an action, then re-fetch the summary. The stream is left as is.
    pub async fn perform(&mut self, action: ContainerAction) -> bool {
        self.performing.send_replace(Some(action));
        let _in_flight = InFlight {
            state: self.performing.clone(),
            clear: |performing: &mut Option<ContainerAction>| *performing = None,
        };

        match self.api.container_action(&self.container_id, action).await {
            Ok(()) => self.refresh().await,
            Err(e) => {
                error!(
                    "Error running {} on container {}: {}",
                    action, self.container_id, e
                );
                self.error = Some(action_failed(action));
                false
            }
        }
    }

    pub fn send_command(&mut self, command: &str) -> Result<()> {
        self.stream.send_command(command)
    }

    pub async fn reconnect(&mut self) -> bool {
        self.stream.reconnect().await
    }

    /// Wait for the next stream event and apply it
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        self.stream.next_event().await
    }

    /// Release the stream when the view goes away
    pub fn close(&mut self) {
        self.stream.close();
    }
}
