//! User profile and credential

use serde::{Deserialize, Serialize};

/// Authenticated user profile, as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl User {
    /// Name shown in the user menu
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !self.email.is_empty() => self.email.as_str(),
            _ => "Anonymous",
        }
    }
}

/// Bearer token plus the profile it was issued for
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub user: User,
}

impl Credential {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// Short token prefix, safe to log
    pub fn redacted(&self) -> String {
        redact(&self.token)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.redacted())
            .field("user", &self.user)
            .finish()
    }
}

pub(crate) fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{}...", prefix)
}
