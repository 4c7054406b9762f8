//! Console configuration

use std::time::Duration;

use serde::Deserialize;

use crate::domain::settings::{Settings, Theme};

/// Console configuration, derived from the environment
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Default REST base URL of the backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default socket base URL of the backend
    #[serde(default = "default_base_ws_url")]
    pub base_ws_url: String,

    /// OAuth client identifier
    #[serde(default = "default_google_client_id")]
    pub google_client_id: String,

    /// Path prefix when deployed under a sub-path ("/" means none)
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Origin the console is served from, used for the OAuth redirect URI
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// REST request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// File holding persisted state. In-memory when unset.
    #[serde(default)]
    pub storage_path: Option<String>,
}

fn default_base_url() -> String {
    "https://felicit.at/dockermanager/api".to_string()
}

fn default_base_ws_url() -> String {
    "wss://felicit.at/dockermanager".to_string()
}

fn default_google_client_id() -> String {
    "509848869065-qsom2a6m7lv5uqn0l61inn3b6gh6g4ef.apps.googleusercontent.com".to_string()
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_app_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Config::default();

        if let Ok(val) = std::env::var("DOCKERMANAGER_BASE_URL") {
            config.base_url = val;
        }
        if let Ok(val) = std::env::var("DOCKERMANAGER_BASE_WS_URL") {
            config.base_ws_url = val;
        }
        if let Ok(val) = std::env::var("DOCKERMANAGER_GOOGLE_CLIENT_ID") {
            config.google_client_id = val;
        }
        if let Ok(val) = std::env::var("DOCKERMANAGER_BASE_PATH") {
            config.base_path = val;
        }
        if let Ok(val) = std::env::var("DOCKERMANAGER_APP_ORIGIN") {
            config.app_origin = val;
        }
        if let Ok(val) = std::env::var("DOCKERMANAGER_REQUEST_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                config.request_timeout = secs;
            }
        }
        if let Ok(val) = std::env::var("DOCKERMANAGER_STORAGE_PATH") {
            config.storage_path = Some(val);
        }

        config
    }

    /// Settings defaults used until the user saves overrides
    pub fn default_settings(&self) -> Settings {
        Settings {
            base_url: self.base_url.clone(),
            base_ws_url: self.base_ws_url.clone(),
            theme: Theme::System,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Prefix a page route with the deployment base path
    pub fn route(&self, path: &str) -> String {
        let prefix = self.base_path.trim_end_matches('/');
        if prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}{}", prefix, path)
        }
    }

    /// OAuth redirect URI for the callback page
    pub fn oauth_redirect_uri(&self) -> String {
        format!(
            "{}{}",
            self.app_origin.trim_end_matches('/'),
            self.route("/auth/callback")
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            base_ws_url: default_base_ws_url(),
            google_client_id: default_google_client_id(),
            base_path: default_base_path(),
            app_origin: default_app_origin(),
            request_timeout: default_request_timeout(),
            storage_path: None,
        }
    }
}
