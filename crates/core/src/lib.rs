//! Trumall Core - Shared domain types.
//!
//! This crate provides the types used across all Trumall client components:
//! - `storefront` - Cart store, checkout flow and REST client
//! - `cli` - Command-line front-end for the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no timers.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, minor-unit money, phone numbers, cart lines,
//!   addresses, shipping and checkout types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
