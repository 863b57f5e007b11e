//! Hearthwood Core - Shared types library.
//!
//! This crate provides the domain types used across all Hearthwood components:
//! - `storefront` - Client runtime (cart store, checkout, API client)
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP clients. Cart arithmetic lives here so it can be tested
//! without a storage backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, and statuses
//! - [`cart`] - The guest cart and its line items
//! - [`summary`] - The enriched checkout snapshot

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod summary;
pub mod types;

pub use cart::{CartLine, GuestCart};
pub use summary::{CartSummary, SummaryItem};
pub use types::*;
