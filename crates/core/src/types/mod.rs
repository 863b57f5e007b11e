//! Core types for Hearthwood.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod rating;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, format_amount};
pub use rating::{Rating, RatingError, format_rating, stars};
pub use status::*;
