//! Account endpoints: login, registration, profile, password change.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{ApiClient, ApiError};
use crate::error::add_breadcrumb;
use crate::session::CurrentUser;

/// Body of `POST /users/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(serialize_with = "super::expose_secret")]
    pub password: SecretString,
}

/// Body of `POST /users/register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    #[serde(serialize_with = "super::expose_secret")]
    pub password: SecretString,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Login/registration response.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    pub user: Option<CurrentUser>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthResponse {
    /// True if the backend issued a token.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Full profile from `GET /users/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `PUT /users/profile`. The username cannot be changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Body of `PUT /users/change-password`.
#[derive(Debug, Serialize)]
pub struct PasswordChangeRequest {
    #[serde(serialize_with = "super::expose_secret")]
    pub current_password: SecretString,
    #[serde(serialize_with = "super::expose_secret")]
    pub new_password: SecretString,
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    user: UserProfile,
}

impl ApiClient {
    /// Log in and store the issued token.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected, the response carries
    /// no token, or the session cannot be stored.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint_segments(&["users", "login"])?;
        let response: AuthResponse = self.post_json(url, request).await?;
        self.store_session(&response)?;
        info!("Logged in");
        add_breadcrumb("auth", "Logged in", None);
        Ok(response)
    }

    /// Create an account. If the backend logs the new user in straight away
    /// (returns a token), the session is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if registration is rejected or the session cannot be
    /// stored.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint_segments(&["users", "register"])?;
        let response: AuthResponse = self.post_json(url, request).await?;
        if response.has_token() {
            self.store_session(&response)?;
        }
        info!("Registered");
        Ok(response)
    }

    /// The logged-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if not logged in or the request fails.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        let url = self.endpoint_segments(&["users", "profile"])?;
        let envelope: ProfileEnvelope = self.get_json(url).await?;
        Ok(envelope.user)
    }

    /// Save the logged-in user's contact details. The stored user is updated
    /// to match so the navbar shows the new name straight away.
    ///
    /// # Errors
    ///
    /// Returns an error if not logged in, the backend rejects the update, or
    /// the stored user cannot be rewritten.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
        let url = self.endpoint_segments(&["users", "profile"])?;
        self.put_value(url, update).await?;

        if let (Some(token), Some(mut user)) = (self.session().token(), self.session().current_user()) {
            user.full_name = Some(update.full_name.clone());
            user.email = Some(update.email.clone());
            self.session().store(&token, Some(&user))?;
        }
        info!("Profile updated");
        add_breadcrumb("auth", "Profile updated", None);
        Ok(())
    }

    /// Change the logged-in user's password. The session stays valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the current password is wrong, not logged in, or
    /// the request fails.
    #[instrument(skip(self, request))]
    pub async fn change_password(&self, request: &PasswordChangeRequest) -> Result<(), ApiError> {
        let url = self.endpoint_segments(&["users", "change-password"])?;
        self.put_value(url, request).await?;
        info!("Password changed");
        add_breadcrumb("auth", "Password changed", None);
        Ok(())
    }

    /// Forget the stored token. Purely local; the backend has no logout
    /// endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the session keys cannot be removed.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session().clear()?;
        add_breadcrumb("auth", "Logged out", None);
        Ok(())
    }

    fn store_session(&self, response: &AuthResponse) -> Result<(), ApiError> {
        let token = response
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Decode("response carried no token".to_string()))?;
        self.session()
            .store(&SecretString::from(token), response.user.as_ref())?;
        Ok(())
    }
}
