//! Authentication session.
//!
//! The session is nothing more than a bearer token (and the profile returned
//! alongside it) held in the key-value store. [`AuthSession`] is the only code
//! that touches the `token` and `user` keys.

use std::sync::Arc;

use hearthwood_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::storage::{KeyValueStore, StorageError, keys, read_lenient};

/// Profile of the logged-in user as returned by login/registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Handle to the stored bearer token.
#[derive(Clone)]
pub struct AuthSession {
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl AuthSession {
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// The stored bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        read_lenient(self.storage.as_ref(), keys::TOKEN)
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from)
    }

    /// True if a token is stored. The token is not checked with the backend.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// The stored profile. A malformed value reads as absent.
    #[must_use]
    pub fn current_user(&self) -> Option<CurrentUser> {
        let text = read_lenient(self.storage.as_ref(), keys::USER)?;
        serde_json::from_str(&text)
            .inspect_err(|e| warn!(error = %e, "Stored user profile is malformed"))
            .ok()
    }

    /// Store a freshly issued token and the profile that came with it.
    ///
    /// # Errors
    ///
    /// Returns an error if either value cannot be persisted.
    pub fn store(&self, token: &SecretString, user: Option<&CurrentUser>) -> Result<(), StorageError> {
        self.storage.set(keys::TOKEN, token.expose_secret())?;
        match user {
            Some(user) => {
                self.storage.set(keys::USER, &serde_json::to_string(user)?)?;
                match &user.user_id {
                    Some(id) => set_sentry_user(id, user.email.as_deref()),
                    None => set_sentry_user(&user.username, user.email.as_deref()),
                }
                info!(username = %user.username, "Session stored");
            }
            None => {
                self.storage.remove(keys::USER)?;
                info!("Session stored");
            }
        }
        Ok(())
    }

    /// Forget the token and profile. Used by logout and by the global 401
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the keys cannot be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::TOKEN)?;
        self.storage.remove(keys::USER)?;
        clear_sentry_user();
        info!("Session cleared");
        Ok(())
    }
}
