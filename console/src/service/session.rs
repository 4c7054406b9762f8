//! Session service

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::config::Config;
use crate::domain::user::{Credential, User};
use crate::error::{Error, Result};
use crate::infra::credentials::CredentialCell;
use crate::infra::navigation::{Navigator, Route};

/// Google OAuth authorization endpoint
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Scopes requested at sign-in
const OAUTH_SCOPE: &str = "email profile openid";

const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";
const PROVIDER_FAILED: &str = "Google sign in was unsuccessful. Please try again.";

/// Session status as seen by views
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Initialization has not resolved yet
    Loading,
    Authenticated(User),
    Unauthenticated,
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::Authenticated(_))
    }
}

/// Session service: credential lifecycle and Google sign-in
pub struct SessionService {
    config: Arc<Config>,
    api: Arc<ApiClient>,
    credentials: Arc<CredentialCell>,
    navigator: Arc<dyn Navigator>,
    initialized: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl SessionService {
    /// Create a new session service
    pub fn new(config: Arc<Config>, api: Arc<ApiClient>, navigator: Arc<dyn Navigator>) -> Self {
        let credentials = api.credentials().clone();
        Self {
            config,
            api,
            credentials,
            navigator,
            initialized: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    /// Verify the persisted credential with the backend
    ///
    /// Any verification failure clears the persisted state.
    pub async fn initialize(&self) -> SessionStatus {
        if let Some(credential) = self.credentials.current() {
            match self.api.verify_token(&credential.token).await {
                Ok(()) => info!("Restored session for {}", credential.user.email),
                Err(e) => {
                    warn!("Token verification failed, signing out: {}", e);
                    self.credentials.clear();
                    self.set_error(Some(SESSION_EXPIRED.to_string()));
                }
            }
        }
        self.initialized.store(true, Ordering::SeqCst);
        self.status()
    }

    pub fn status(&self) -> SessionStatus {
        if !self.initialized.load(Ordering::SeqCst) {
            return SessionStatus::Loading;
        }
        match self.credentials.current() {
            Some(credential) => SessionStatus::Authenticated(credential.user),
            None => SessionStatus::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status().is_authenticated()
    }

    pub fn user(&self) -> Option<User> {
        self.credentials.current().map(|c| c.user)
    }

    /// Credential changes, for re-evaluating session gates
    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.credentials.subscribe()
    }

    /// OAuth authorization-code URL, with the backend base URL carried in `state`
    pub fn authorization_url(&self) -> Result<String> {
        let redirect_uri = self.config.oauth_redirect_uri();
        let backend = self.api.endpoints().rest_base;
        let url = reqwest::Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.config.google_client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", OAUTH_SCOPE),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("state", backend.as_str()),
            ],
        )
        .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(url.to_string())
    }

    /// Start the redirect-based Google sign-in
    pub fn sign_in_with_google(&self) -> Result<String> {
        match self.authorization_url() {
            Ok(url) => {
                info!("Redirecting to Google sign-in");
                self.navigator.navigate_external(&url);
                Ok(url)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Finish the redirect flow: exchange the code, persist, go to the dashboard
    pub async fn complete_sign_in(&self, code: &str) -> Result<User> {
        let outcome = self.api.sign_in_with_code(code).await;
        let user = self.finish_sign_in(outcome)?;
        self.navigator.navigate(&Route::Dashboard);
        Ok(user)
    }

    /// Sign in with a Google ID token obtained on the login page
    pub async fn complete_sign_in_with_id_token(&self, token: &str) -> Result<User> {
        let outcome = self.api.sign_in_with_id_token(token).await;
        self.finish_sign_in(outcome)
    }

    fn finish_sign_in(&self, outcome: Result<Credential>) -> Result<User> {
        let stored = outcome.and_then(|credential| {
            self.credentials.store(credential.clone())?;
            Ok(credential)
        });
        match stored {
            Ok(credential) => {
                self.initialized.store(true, Ordering::SeqCst);
                self.set_error(None);
                info!("Signed in as {}", credential.user.email);
                Ok(credential.user)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// The Google widget reported a failure before any token was issued
    pub fn report_provider_failure(&self) {
        warn!("Google sign in returned no credential");
        self.set_error(Some(PROVIDER_FAILED.to_string()));
    }

    /// Clear the session. No backend call is made.
    pub fn sign_out(&self) {
        self.credentials.clear();
        self.set_error(None);
        info!("Signed out");
    }

    /// User-facing error of the last sign-in attempt
    pub fn error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|e| e.clone())
    }

    pub fn dismiss_error(&self) {
        self.set_error(None);
    }

    fn fail(&self, e: &Error) {
        error!("Sign in failed: {}", e);
        self.set_error(Some(format!("Sign in failed: {}", e)));
    }

    fn set_error(&self, message: Option<String>) {
        if let Ok(mut last_error) = self.last_error.lock() {
            *last_error = message;
        }
    }
}
