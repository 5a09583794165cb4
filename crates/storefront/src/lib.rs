//! Trumall storefront client.
//!
//! Owns the buyer's cart and the M-Pesa checkout for the Trumall REST API.
//!
//! # Architecture
//!
//! - [`api`]: the [`CommerceApi`](api::CommerceApi) seam and its `reqwest`
//!   implementation
//! - [`cart`]: cart snapshot kept in step with the server
//! - [`address`], [`shipping`]: address book and delivery options
//! - [`checkout`]: validation and STK push submission
//! - [`payment`]: status polling until the payment resolves
//! - [`outcome`]: side effects of a finished payment
//! - [`flow`]: the checkout state machine tying the above together
//! - [`notify`]: where buyer-facing messages and navigation go
//!
//! Every component takes its collaborators as `Arc<dyn ...>` so a UI layer or
//! a test can swap them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod flow;
pub mod notify;
pub mod outcome;
pub mod payment;
pub mod shipping;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::address::AddressBook;
use crate::api::{ApiError, CommerceApi, HttpApi};
use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::flow::CheckoutFlow;
use crate::notify::{Navigator, Notifier, TracingNavigator, TracingNotifier};
use crate::shipping::ShippingSelector;

/// All storefront components for one signed-in buyer.
#[derive(Clone)]
pub struct Storefront {
    pub api: Arc<dyn CommerceApi>,
    pub cart: Arc<CartStore>,
    pub addresses: Arc<AddressBook>,
    pub shipping: ShippingSelector,
    pub checkout: CheckoutFlow,
}

impl Storefront {
    /// Wire every component over the HTTP API, reporting through `tracing`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the HTTP client cannot be built.
    pub fn connect(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let api: Arc<dyn CommerceApi> = Arc::new(HttpApi::new(config)?);
        Ok(Self::with_parts(
            api,
            Arc::new(TracingNotifier),
            Arc::new(TracingNavigator),
            config,
        ))
    }

    /// Wire every component over the given collaborators.
    pub fn with_parts(
        api: Arc<dyn CommerceApi>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        config: &StorefrontConfig,
    ) -> Self {
        let cart = Arc::new(CartStore::new(api.clone(), notifier.clone()));
        let addresses = Arc::new(AddressBook::new(api.clone(), notifier.clone()));
        let shipping = ShippingSelector::new(api.clone(), notifier.clone());
        let checkout = CheckoutFlow::new(api.clone(), cart.clone(), notifier, navigator, config.poll);

        Self {
            api,
            cart,
            addresses,
            shipping,
            checkout,
        }
    }
}
