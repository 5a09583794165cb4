//! Trumall REST API access.
//!
//! # Architecture
//!
//! - [`CommerceApi`] is the seam every component depends on; it is injected
//!   as `Arc<dyn CommerceApi>` so tests can script responses.
//! - [`HttpApi`] is the production implementation over `reqwest`.
//! - The server is the source of truth: no local persistence, every
//!   mutation goes through the API.
//!
//! # Example
//!
//! ```rust,ignore
//! use trumall_storefront::api::{CommerceApi, HttpApi};
//!
//! let api = HttpApi::new(&config)?;
//! let cart = api.get_cart().await?;
//! let cart = api.increase_quantity(&cart[0].product_id).await?;
//! ```

mod client;
pub mod types;

pub use client::{HttpApi, REQUEST_ID_HEADER};

use async_trait::async_trait;
use thiserror::Error;
use trumall_core::{
    Address, AddressId, AddressInput, CartLine, CartLineId, CheckoutRequest, CheckoutRequestId,
    CheckoutSession, OrderId, PaymentStatus, ProductId, ShippingMethod, ShippingOption,
    ShippingQuote,
};

/// Errors that can occur when talking to the Trumall API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api {
        status: u16,
        message: String,
        /// The `error` field of the JSON body, when the server sent one.
        server_message: Option<String>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response was well-formed but unusable.
    #[error("Unexpected response: {0}")]
    Unexpected(String),

    /// A request header could not be built.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// HTTP status code, for errors the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The human-readable message the server attached to the failure.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { server_message, .. } => server_message.as_deref(),
            _ => None,
        }
    }

    /// Whether the failure is on the server or the network rather than in
    /// the request itself.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) | Self::Unexpected(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::InvalidHeader(_) => false,
        }
    }
}

/// Operations the storefront needs from the Trumall backend.
///
/// All requests are authenticated with the buyer's bearer token. Monetary
/// amounts are integer cents in both directions.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// `GET /cart`. A 404 or 204 is an empty cart, not an error.
    async fn get_cart(&self) -> Result<Vec<CartLine>, ApiError>;

    /// `POST /cart/add`.
    async fn add_to_cart(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError>;

    /// `POST /cart/increase`; returns the full cart after the change.
    async fn increase_quantity(&self, product_id: &ProductId) -> Result<Vec<CartLine>, ApiError>;

    /// `POST /cart/decrease`; returns the full cart after the change.
    async fn decrease_quantity(&self, product_id: &ProductId) -> Result<Vec<CartLine>, ApiError>;

    /// `DELETE /cart/{lineId}`.
    async fn remove_line(&self, line_id: &CartLineId) -> Result<(), ApiError>;

    /// `DELETE /cart/clear`.
    async fn clear_cart(&self) -> Result<(), ApiError>;

    // -------------------------------------------------------------------------
    // Addresses
    // -------------------------------------------------------------------------

    /// `GET /addresses`.
    async fn list_addresses(&self) -> Result<Vec<Address>, ApiError>;

    /// `POST /addresses`.
    async fn create_address(&self, input: &AddressInput) -> Result<Address, ApiError>;

    /// `PUT /addresses/{id}`.
    async fn update_address(&self, id: &AddressId, input: &AddressInput)
    -> Result<Address, ApiError>;

    /// `DELETE /addresses/{id}`.
    async fn delete_address(&self, id: &AddressId) -> Result<(), ApiError>;

    /// `PUT /addresses/{id}/default`.
    async fn set_default_address(&self, id: &AddressId) -> Result<(), ApiError>;

    // -------------------------------------------------------------------------
    // Shipping
    // -------------------------------------------------------------------------

    /// `GET /shipping/methods?address_id=`.
    async fn shipping_methods(&self, address_id: &AddressId)
    -> Result<Vec<ShippingOption>, ApiError>;

    /// `POST /shipping/calculate`.
    async fn calculate_shipping(
        &self,
        address_id: &AddressId,
        method: ShippingMethod,
    ) -> Result<ShippingQuote, ApiError>;

    // -------------------------------------------------------------------------
    // Checkout & payments
    // -------------------------------------------------------------------------

    /// `POST /cart/checkout`: creates the order and sends the STK push.
    async fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ApiError>;

    /// `GET /payments/status?orderId=&checkoutRequestId=`.
    async fn payment_status(
        &self,
        order_id: &OrderId,
        checkout_request_id: &CheckoutRequestId,
    ) -> Result<PaymentStatus, ApiError>;
}
