//! Page routes and navigation effects

/// Console page routes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Settings,
    AuthCallback,
    Container(String),
}

impl Route {
    /// Route path, without the deployment base path
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Settings => "/settings".to_string(),
            Route::AuthCallback => "/auth/callback".to_string(),
            Route::Container(id) => format!("/container/{}", id),
        }
    }
}

/// Executes navigation side effects on behalf of the console
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    /// Navigate to a console page
    fn navigate(&self, route: &Route);

    /// Leave the console for an external URL
    fn navigate_external(&self, url: &str);
}
