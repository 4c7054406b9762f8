//! Console settings

use serde::{Deserialize, Serialize};

/// Presentation theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the operating-system color preference
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

/// Process-wide settings. Persisted as `{baseUrl, baseWsUrl, theme}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub base_url: String,
    pub base_ws_url: String,
    pub theme: Theme,
}

/// Partial settings update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_ws_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl Settings {
    /// Merge a partial update over these settings
    pub fn merged(&self, patch: SettingsPatch) -> Settings {
        Settings {
            base_url: patch.base_url.unwrap_or_else(|| self.base_url.clone()),
            base_ws_url: patch.base_ws_url.unwrap_or_else(|| self.base_ws_url.clone()),
            theme: patch.theme.unwrap_or(self.theme),
        }
    }
}
