//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for every user action. Front ends show
//! [`AppError::user_message`] and follow [`AppError::redirect`]; internal
//! details never reach the user.

use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::ValidationError;
use crate::config::ConfigError;
use crate::routes::Redirect;
use crate::storage::StorageError;

/// Message shown when no more specific text is available.
const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Local storage could not be written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Backend request failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Input was rejected before any request was made.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration is missing or invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A checkout submission ended in the failed state.
    #[error("Checkout failed: {message}")]
    Checkout {
        message: String,
        redirect: Option<Redirect>,
    },
}

impl AppError {
    /// Text to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "Could not save your changes. Please try again.".to_string(),
            Self::Api(err) if err.is_not_found() => "Not found".to_string(),
            Self::Api(err) => err.user_message(GENERIC_MESSAGE),
            Self::Validation(err) => err.to_string(),
            Self::Config(_) => "The storefront is not configured correctly.".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Checkout { message, .. } => message.clone(),
        }
    }

    /// Where the user should be sent after this error, if anywhere.
    ///
    /// A 401 from any request sends the user to the login page.
    #[must_use]
    pub const fn redirect(&self) -> Option<Redirect> {
        match self {
            Self::Api(ApiError::Unauthorized) => Some(Redirect::Login),
            Self::Checkout { redirect, .. } => *redirect,
            _ => None,
        }
    }

    /// Log the error and capture it to Sentry if it is not the user's doing.
    pub fn report(&self) {
        let unexpected = matches!(
            self,
            Self::Storage(_)
                | Self::Config(_)
                | Self::Api(ApiError::Decode(_) | ApiError::InvalidUrl(_) | ApiError::Session(_))
        );
        if unexpected {
            let event_id = sentry::capture_error(self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Action failed");
        } else {
            tracing::warn!(error = %self, "Action failed");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("count", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
