//! Settings service

use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::api::ApiClient;
use crate::domain::settings::{Settings, SettingsPatch, Theme};
use crate::error::Result;
use crate::infra::storage::{KeyValueStore, SETTINGS_KEY};
use crate::infra::theme::ThemeController;

/// Settings service: defaults merged with persisted overrides
///
/// Every change is persisted, pushed to the API client and applied to the theme.
pub struct SettingsService {
    defaults: Settings,
    current: RwLock<Settings>,
    storage: Arc<dyn KeyValueStore>,
    api: Arc<ApiClient>,
    theme: ThemeController,
}

impl SettingsService {
    /// Create the service from defaults and whatever is persisted
    pub fn new(
        defaults: Settings,
        storage: Arc<dyn KeyValueStore>,
        api: Arc<ApiClient>,
        theme: ThemeController,
    ) -> Self {
        let current = defaults.merged(load_persisted(storage.as_ref()));
        let service = Self {
            defaults,
            current: RwLock::new(current.clone()),
            storage,
            api,
            theme,
        };
        service.apply(&current);
        service
    }

    /// Current settings
    pub fn get(&self) -> Settings {
        match self.current.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Merge a partial update and persist it
    pub fn update(&self, patch: SettingsPatch) -> Result<Settings> {
        let next = self.get().merged(patch);
        self.replace(next)
    }

    /// Restore the defaults
    pub fn reset(&self) -> Result<Settings> {
        info!("Resetting settings to defaults");
        self.replace(self.defaults.clone())
    }

    /// Apply a theme without saving it
    pub fn preview_theme(&self, theme: Theme) {
        self.theme.apply(theme);
    }

    fn replace(&self, next: Settings) -> Result<Settings> {
        self.storage
            .set(SETTINGS_KEY, &serde_json::to_string(&next)?)?;
        {
            let mut current = match self.current.write() {
                Ok(current) => current,
                Err(poisoned) => poisoned.into_inner(),
            };
            *current = next.clone();
        }
        self.apply(&next);
        info!(
            "Settings saved: base_url={} base_ws_url={} theme={}",
            next.base_url,
            next.base_ws_url,
            next.theme.as_str()
        );
        Ok(next)
    }

    fn apply(&self, settings: &Settings) {
        self.api
            .set_endpoints(&settings.base_url, &settings.base_ws_url);
        self.theme.apply(settings.theme);
    }
}

/// Outcome of the last save from the settings page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saved,
    Failed,
}

/// Draft editor behind the settings page
///
/// Edits stay local until saved. Theme edits are previewed immediately.
pub struct SettingsEditor<'a> {
    service: &'a SettingsService,
    draft: Settings,
    has_changes: bool,
    status: SaveStatus,
}

impl<'a> SettingsEditor<'a> {
    pub fn new(service: &'a SettingsService) -> Self {
        Self {
            service,
            draft: service.get(),
            has_changes: false,
            status: SaveStatus::Idle,
        }
    }

    pub fn draft(&self) -> &Settings {
        &self.draft
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    /// Edit the draft
    pub fn change(&mut self, patch: SettingsPatch) {
        if let Some(theme) = patch.theme {
            self.service.preview_theme(theme);
        }
        self.draft = self.draft.merged(patch);
        self.has_changes = true;
        self.status = SaveStatus::Idle;
    }

    /// Persist the draft
    pub fn save(&mut self) -> bool {
        let patch = SettingsPatch {
            base_url: Some(self.draft.base_url.clone()),
            base_ws_url: Some(self.draft.base_ws_url.clone()),
            theme: Some(self.draft.theme),
        };
        match self.service.update(patch) {
            Ok(saved) => {
                self.draft = saved;
                self.has_changes = false;
                self.status = SaveStatus::Saved;
                true
            }
            Err(e) => {
                warn!("Failed to save settings: {}", e);
                self.status = SaveStatus::Failed;
                false
            }
        }
    }

    /// Throw the draft away and restore the saved theme
    pub fn discard(&mut self) {
        self.draft = self.service.get();
        self.service.preview_theme(self.draft.theme);
        self.has_changes = false;
        self.status = SaveStatus::Idle;
    }

    /// Restore and persist the defaults; the draft shows them as unsaved edits
    pub fn reset_to_defaults(&mut self) -> bool {
        let reset = self.service.reset();
        self.draft = self.service.defaults().clone();
        self.has_changes = true;
        self.status = SaveStatus::Idle;
        if let Err(e) = reset {
            warn!("Failed to reset settings: {}", e);
            self.status = SaveStatus::Failed;
            return false;
        }
        true
    }
}

fn load_persisted(storage: &dyn KeyValueStore) -> SettingsPatch {
    let raw = match storage.get(SETTINGS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return SettingsPatch::default(),
        Err(e) => {
            warn!("Failed to read saved settings: {}", e);
            return SettingsPatch::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(patch) => patch,
        Err(e) => {
            warn!("Error parsing saved settings, using defaults: {}", e);
            SettingsPatch::default()
        }
    }
}
