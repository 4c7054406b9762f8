//! Theme application

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::settings::Theme;

/// Operating-system color preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
    Light,
    Dark,
}

/// Document root receiving the presentation class
#[cfg_attr(test, mockall::automock)]
pub trait ThemeTarget: Send + Sync {
    /// Add or remove the dark class
    fn set_dark(&self, dark: bool);
}

/// Applies the selected theme and tracks the OS preference while the theme is `System`
pub struct ThemeController {
    target: Arc<dyn ThemeTarget>,
    system: watch::Receiver<ColorScheme>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ThemeController {
    pub fn new(target: Arc<dyn ThemeTarget>, system: watch::Receiver<ColorScheme>) -> Self {
        Self {
            target,
            system,
            listener: Mutex::new(None),
        }
    }

    /// Apply a theme immediately
    pub fn apply(&self, theme: Theme) {
        let scheme = match theme {
            Theme::Light => ColorScheme::Light,
            Theme::Dark => ColorScheme::Dark,
            Theme::System => *self.system.borrow(),
        };
        self.target.set_dark(scheme == ColorScheme::Dark);

        if theme == Theme::System {
            self.start_listener();
        } else {
            self.stop_listener();
        }
    }

    /// Whether the OS preference is being tracked
    pub fn is_tracking(&self) -> bool {
        self.listener
            .lock()
            .map(|l| l.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    fn start_listener(&self) {
        let Ok(mut listener) = self.listener.lock() else {
            return;
        };
        if listener.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime available, OS color preference not tracked");
            return;
        };

        let target = self.target.clone();
        let mut system = self.system.clone();
        system.mark_unchanged();
        *listener = Some(runtime.spawn(async move {
            while system.changed().await.is_ok() {
                let scheme = *system.borrow_and_update();
                debug!("OS color preference changed to {:?}", scheme);
                target.set_dark(scheme == ColorScheme::Dark);
            }
        }));
    }

    fn stop_listener(&self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for ThemeController {
    fn drop(&mut self) {
        self.stop_listener();
    }
}
