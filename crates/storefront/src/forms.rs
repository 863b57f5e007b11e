//! User input forms and their validation rules.
//!
//! Validation happens before any request is made and before any stored state
//! changes. The first failing rule wins; later fields are not checked.

use hearthwood_core::{Email, EmailError, OrderId, Rating, RatingError};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::api::{PasswordChangeRequest, ProfileUpdate, ReviewRequest};
use crate::checkout::Discrepancy;

/// Minimum username length for the inline guest account.
pub const MIN_USERNAME_LEN: usize = 3;

/// Minimum password length for the inline guest account.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Input rejected before submission. The `Display` text is what the user
/// sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Please fill in all required fields")]
    MissingRequiredFields,

    #[error("Username must be at least 3 characters")]
    UsernameTooShort,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Please enter your shipping address")]
    MissingShippingAddress,

    #[error("Please enter both order ID and email")]
    MissingTrackingFields,

    #[error("Please enter a valid order ID")]
    InvalidOrderId,

    #[error("Please enter a valid email address")]
    InvalidEmail(#[from] EmailError),

    #[error("Please select a rating")]
    RatingRequired,

    #[error("Rating must be between 1 and 5")]
    InvalidRating,

    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Catalog prices or stock changed since the cart was snapshotted.
    #[error("Some items in your cart have changed: {}", join(.0))]
    StaleCart(Vec<Discrepancy>),
}

fn join(discrepancies: &[Discrepancy]) -> String {
    discrepancies
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The checkout form.
///
/// Account fields are only used (and only validated) when the shopper is not
/// logged in; checkout then creates the account along with the order.
#[derive(Debug)]
pub struct CheckoutForm {
    pub username: String,
    pub password: SecretString,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
}

impl Default for CheckoutForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: SecretString::from(String::new()),
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            shipping_address: String::new(),
        }
    }
}

impl CheckoutForm {
    /// Form for a logged-in shopper: only the address matters.
    #[must_use]
    pub fn for_member(shipping_address: impl Into<String>) -> Self {
        Self {
            shipping_address: shipping_address.into(),
            ..Self::default()
        }
    }

    /// Check the form against the submission rules, in order:
    ///
    /// 1. the cart is not empty
    /// 2. guests: username, password, full name, email and phone are filled in
    /// 3. guests: username has at least [`MIN_USERNAME_LEN`] characters
    /// 4. guests: password has at least [`MIN_PASSWORD_LEN`] characters
    /// 5. the shipping address is filled in
    ///
    /// # Errors
    ///
    /// Returns the first rule that fails.
    pub fn validate(&self, cart_empty: bool, authenticated: bool) -> Result<(), ValidationError> {
        if cart_empty {
            return Err(ValidationError::EmptyCart);
        }

        if !authenticated {
            let password = self.password.expose_secret();
            let missing = [&self.username, &self.full_name, &self.email, &self.phone]
                .iter()
                .any(|field| field.trim().is_empty())
                || password.is_empty();
            if missing {
                return Err(ValidationError::MissingRequiredFields);
            }
            if self.username.trim().chars().count() < MIN_USERNAME_LEN {
                return Err(ValidationError::UsernameTooShort);
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(ValidationError::PasswordTooShort);
            }
        }

        if self.shipping_address.trim().is_empty() {
            return Err(ValidationError::MissingShippingAddress);
        }
        Ok(())
    }
}

/// The guest order tracking form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingForm {
    pub order_id: String,
    pub email: String,
}

impl TrackingForm {
    /// Both fields are required; the id must be numeric and the email well
    /// formed.
    ///
    /// # Errors
    ///
    /// Returns the first rule that fails.
    pub fn validate(&self) -> Result<(OrderId, Email), ValidationError> {
        if self.order_id.trim().is_empty() || self.email.trim().is_empty() {
            return Err(ValidationError::MissingTrackingFields);
        }
        let order_id = self
            .order_id
            .trim()
            .trim_start_matches('#')
            .parse::<OrderId>()
            .map_err(|_| ValidationError::InvalidOrderId)?;
        let email = Email::parse(&self.email)?;
        Ok((order_id, email))
    }
}

/// The review form under a product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewForm {
    /// Selected stars; zero means none selected yet.
    pub rating: u8,
    /// Optional free text.
    pub review_text: String,
}

impl ReviewForm {
    /// A rating of one to five stars is required; the text is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if no rating is selected or it is out of range.
    pub fn validate(&self) -> Result<ReviewRequest, ValidationError> {
        let rating = Rating::new(self.rating).map_err(|e| match e {
            RatingError::Missing => ValidationError::RatingRequired,
            RatingError::OutOfRange(_) => ValidationError::InvalidRating,
        })?;
        Ok(ReviewRequest {
            rating,
            review_text: self.review_text.trim().to_string(),
        })
    }
}

/// The profile settings form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

impl ProfileForm {
    /// Name and email are required and the email must be well formed. A blank
    /// phone is left out of the update.
    ///
    /// # Errors
    ///
    /// Returns the first rule that fails.
    pub fn validate(&self) -> Result<ProfileUpdate, ValidationError> {
        if self.full_name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(ValidationError::MissingRequiredFields);
        }
        let email = Email::parse(&self.email)?;
        let phone = self.phone.trim();
        Ok(ProfileUpdate {
            full_name: self.full_name.trim().to_string(),
            email: email.as_str().to_string(),
            phone: (!phone.is_empty()).then(|| phone.to_string()),
        })
    }
}

/// The change-password form.
#[derive(Debug)]
pub struct PasswordChangeForm {
    pub current_password: SecretString,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

impl PasswordChangeForm {
    /// All three fields are required, the confirmation must match, and the
    /// new password must have at least [`MIN_PASSWORD_LEN`] characters.
    ///
    /// # Errors
    ///
    /// Returns the first rule that fails.
    pub fn validate(&self) -> Result<PasswordChangeRequest, ValidationError> {
        let current = self.current_password.expose_secret();
        let new = self.new_password.expose_secret();
        if current.is_empty() || new.is_empty() || self.confirm_password.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequiredFields);
        }
        if new != self.confirm_password.expose_secret() {
            return Err(ValidationError::PasswordMismatch);
        }
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        Ok(PasswordChangeRequest {
            current_password: SecretString::from(current),
            new_password: SecretString::from(new),
        })
    }
}
