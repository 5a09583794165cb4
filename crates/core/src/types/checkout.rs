//! Checkout request, session and shipping types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::{AddressId, CheckoutRequestId, OrderId};
use super::phone::PhoneNumber;
use super::price::Cents;
use super::status::ShippingMethod;

/// Body submitted to start a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub phone: PhoneNumber,
    pub address_id: AddressId,
    pub shipping_method: ShippingMethod,
}

/// A checkout that has been accepted by the server and is awaiting payment
/// confirmation.
///
/// Lives for one polling loop and is discarded on its terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub order_id: OrderId,
    pub checkout_request_id: CheckoutRequestId,
    pub shipping_cost: Cents,
    pub estimated_delivery: Option<NaiveDate>,
}

/// A delivery option available for an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub method: ShippingMethod,
    pub name: String,
    pub delivery_days_min: u32,
    pub delivery_days_max: u32,
    pub is_free_shipping: bool,
}

impl ShippingOption {
    /// Options offered when the server cannot be asked.
    #[must_use]
    pub fn fallback() -> Vec<Self> {
        vec![
            Self {
                method: ShippingMethod::Standard,
                name: "Standard Shipping".to_string(),
                delivery_days_min: 3,
                delivery_days_max: 5,
                is_free_shipping: false,
            },
            Self {
                method: ShippingMethod::Express,
                name: "Express Shipping".to_string(),
                delivery_days_min: 1,
                delivery_days_max: 2,
                is_free_shipping: false,
            },
        ]
    }

    /// Delivery window, e.g. `3-5 days`.
    #[must_use]
    pub fn delivery_window(&self) -> String {
        format!("{}-{} days", self.delivery_days_min, self.delivery_days_max)
    }
}

/// Price and date for shipping the current cart with a given method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub method: ShippingMethod,
    pub cost: Cents,
    pub estimated_delivery: Option<NaiveDate>,
    pub is_free_shipping: bool,
}
