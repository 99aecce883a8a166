//! ABC Retail Core - Shared domain types.
//!
//! This crate provides the value types used across all ABC Retail components:
//! - `web` - Server-rendered admin and customer surfaces
//! - `cli` - Command-line tools for migrations, seeding and account setup
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Every constructor validates its input so the web layer
//! can rely on a parsed value being well-formed.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, usernames, emails, prices, statuses and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
