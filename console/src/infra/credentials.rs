//! Stored credential shared by the session store and the API client

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::user::{Credential, User};
use crate::error::Result;
use crate::infra::storage::{KeyValueStore, TOKEN_KEY, USER_KEY};

/// Persisted credential with change notification
///
/// Subscribers observe every transition between present and absent.
pub struct CredentialCell {
    storage: Arc<dyn KeyValueStore>,
    tx: watch::Sender<Option<Credential>>,
}

impl CredentialCell {
    /// Load the persisted credential. Unreadable or partial state loads as absent.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let credential = match read_persisted(storage.as_ref()) {
            Ok(credential) => credential,
            Err(e) => {
                warn!("Discarding unreadable persisted credential: {}", e);
                None
            }
        };
        let (tx, _) = watch::channel(credential);
        Self { storage, tx }
    }

    pub fn current(&self) -> Option<Credential> {
        self.tx.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|c| c.token.clone())
    }

    pub fn is_present(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Persist a new credential and publish it
    pub fn store(&self, credential: Credential) -> Result<()> {
        self.storage.set(TOKEN_KEY, &credential.token)?;
        self.storage
            .set(USER_KEY, &serde_json::to_string(&credential.user)?)?;
        info!(
            "Stored credential {} for {}",
            credential.redacted(),
            credential.user.email
        );
        self.tx.send_replace(Some(credential));
        Ok(())
    }

    /// Drop the credential. Returns whether one was present.
    ///
    /// Storage failures are logged; the in-memory credential is cleared regardless.
    pub fn clear(&self) -> bool {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!("Failed to remove persisted {}: {}", key, e);
            }
        }
        let cleared = self.tx.send_if_modified(|current| current.take().is_some());
        if cleared {
            info!("Credential cleared");
        }
        cleared
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.tx.subscribe()
    }
}

fn read_persisted(storage: &dyn KeyValueStore) -> Result<Option<Credential>> {
    let token = storage.get(TOKEN_KEY)?;
    let user = storage.get(USER_KEY)?;
    match (token, user) {
        (Some(token), Some(user)) if !token.is_empty() => {
            let user: User = serde_json::from_str(&user)?;
            Ok(Some(Credential::new(token, user)))
        }
        _ => Ok(None),
    }
}
