//! Application context
//!
//! One context is created at application start and handed to every view.
//! It owns the process-wide settings and session state; nothing in the
//! crate reaches for globals.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::api::{ApiClient, SocketConnector, WsConnector};
use crate::config::Config;
use crate::error::Result;
use crate::infra::credentials::CredentialCell;
use crate::infra::navigation::{Navigator, Route};
use crate::infra::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::infra::theme::{ColorScheme, ThemeController, ThemeTarget};
use crate::service::containers::{ContainerDetailView, ContainerListView};
use crate::service::gate::{Guard, SessionGate};
use crate::service::session::{SessionService, SessionStatus};
use crate::service::settings::{SettingsEditor, SettingsService};

/// Host-provided effects and sources the context is wired to
pub struct Platform {
    pub storage: Arc<dyn KeyValueStore>,
    pub navigator: Arc<dyn Navigator>,
    pub theme_target: Arc<dyn ThemeTarget>,
    pub color_scheme: watch::Receiver<ColorScheme>,
    pub connector: Arc<dyn SocketConnector>,
}

impl Platform {
    /// Storage chosen by the config, WebSocket transport
    pub fn from_config(
        config: &Config,
        navigator: Arc<dyn Navigator>,
        theme_target: Arc<dyn ThemeTarget>,
        color_scheme: watch::Receiver<ColorScheme>,
    ) -> Self {
        let storage: Arc<dyn KeyValueStore> = match &config.storage_path {
            Some(path) => Arc::new(FileStore::open(path)),
            None => Arc::new(MemoryStore::new()),
        };
        Self {
            storage,
            navigator,
            theme_target,
            color_scheme,
            connector: Arc::new(WsConnector::new()),
        }
    }
}

/// Explicitly constructed application context
pub struct AppContext {
    config: Arc<Config>,
    storage: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    api: Arc<ApiClient>,
    settings: SettingsService,
    session: SessionService,
}

impl AppContext {
    /// Wire the context. Persisted settings and credential are applied here.
    pub fn new(config: Config, platform: Platform) -> Result<Self> {
        let config = Arc::new(config);
        let credentials = Arc::new(CredentialCell::load(platform.storage.clone()));
        let api = Arc::new(ApiClient::new(
            &config,
            credentials,
            platform.connector.clone(),
        )?);

        let theme = ThemeController::new(platform.theme_target, platform.color_scheme);
        let settings = SettingsService::new(
            config.default_settings(),
            platform.storage.clone(),
            api.clone(),
            theme,
        );
        let session = SessionService::new(config.clone(), api.clone(), platform.navigator.clone());

        info!(
            "Console context ready, backend {}",
            api.endpoints().rest_base
        );

        Ok(Self {
            config,
            storage: platform.storage,
            navigator: platform.navigator,
            api,
            settings,
            session,
        })
    }

    /// Verify the persisted credential; the session leaves `Loading` here
    pub async fn start(&self) -> SessionStatus {
        self.session.initialize().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    pub fn session(&self) -> &SessionService {
        &self.session
    }

    /// Draft editor for the settings page
    pub fn settings_editor(&self) -> SettingsEditor<'_> {
        SettingsEditor::new(&self.settings)
    }

    /// Full path of a page route, base path included
    pub fn path(&self, route: &Route) -> String {
        self.config.route(&route.path())
    }

    /// Gate for a view, synced with the current session status
    pub fn gate(&self, guard: Guard) -> SessionGate {
        let mut gate = SessionGate::new(guard, self.navigator.clone());
        gate.sync(&self.session.status());
        gate
    }

    pub fn list_view(&self) -> ContainerListView {
        ContainerListView::new(self.api.clone())
    }

    pub fn detail_view(&self, container_id: &str) -> ContainerDetailView {
        ContainerDetailView::new(self.api.clone(), container_id)
    }

    /// Landing page of the OAuth redirect: exchange the code, then go to the dashboard
    pub async fn handle_auth_callback(&self, code: Option<&str>) -> bool {
        match code {
            Some(code) => self.session.complete_sign_in(code).await.is_ok(),
            None => {
                self.navigator.navigate(&Route::Dashboard);
                false
            }
        }
    }

    /// Drop the session and restore default settings
    pub fn reset(&self) -> Result<()> {
        self.session.sign_out();
        self.settings.reset()?;
        Ok(())
    }
}
