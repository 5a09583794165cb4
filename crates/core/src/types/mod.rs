//! Core types for Trumall.
//!
//! This module provides type-safe wrappers for the storefront's domain
//! concepts.

pub mod address;
pub mod cart;
pub mod checkout;
pub mod id;
pub mod phone;
pub mod price;
pub mod status;

pub use address::{Address, AddressInput, default_selection};
pub use cart::{Cart, CartLine};
pub use checkout::{CheckoutRequest, CheckoutSession, ShippingOption, ShippingQuote};
pub use id::*;
pub use phone::{PhoneError, PhoneNumber};
pub use price::{Cents, CurrencyCode, Money};
pub use status::*;
