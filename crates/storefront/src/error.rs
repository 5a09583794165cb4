//! Unified error handling with Sentry integration.
//!
//! Each component has its own error enum; `AppError` gathers them for
//! front-ends and decides which failures are worth a Sentry event.

use thiserror::Error;
use trumall_core::{Cents, PhoneError};

use crate::api::ApiError;
use crate::config::ConfigError;

/// Fallback shown when checkout submission fails without a server message.
pub const SUBMISSION_FALLBACK_MESSAGE: &str = "Payment failed to start. Please try again.";

/// Cart store failures.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity must be at least one.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// The cart service rejected or failed the request.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Checkout initiation failures.
///
/// Everything except [`CheckoutError::Submission`] and
/// [`CheckoutError::InProgress`] is a validation failure detected before any
/// network call.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Please select a payment method")]
    NoPaymentMethod,

    #[error("Card payment is not implemented yet")]
    UnsupportedPaymentMethod,

    #[error("Please enter a valid phone number")]
    InvalidPhone(#[source] PhoneError),

    #[error("Please select a delivery address.")]
    NoAddress,

    #[error("Please select a shipping method.")]
    NoShippingMethod,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Order total {total} is below the minimum payable amount")]
    BelowMinimum { total: Cents },

    /// A checkout is already submitting or awaiting confirmation.
    #[error("A checkout is already in progress")]
    InProgress,

    /// `POST /cart/checkout` failed.
    #[error("Checkout submission failed: {0}")]
    Submission(#[source] ApiError),
}

impl CheckoutError {
    /// Whether this failure was caught locally, before any network call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::InProgress | Self::Submission(_))
    }

    /// The message shown to the buyer.
    ///
    /// Submission failures surface the server's `error` field when present.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Submission(err) => err
                .server_message()
                .map_or_else(|| SUBMISSION_FALLBACK_MESSAGE.to_string(), str::to_string),
            other => other.to_string(),
        }
    }
}

/// Application-level error type for storefront front-ends.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// The payment did not complete (failed, timed out or cancelled).
    #[error("Payment not completed: {0}")]
    PaymentIncomplete(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error points at the server, the network or a bug, rather
    /// than at the buyer's input.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        match self {
            Self::Api(err) | Self::Cart(CartError::Api(err)) => err.is_server_side(),
            Self::Checkout(CheckoutError::Submission(err)) => err.is_server_side(),
            Self::Internal(_) => true,
            _ => false,
        }
    }

    /// Capture server-side errors to Sentry and log them.
    ///
    /// Returns the Sentry event id when an event was sent.
    pub fn report(&self) -> Option<sentry::types::Uuid> {
        if !self.is_server_side() {
            tracing::debug!(error = %self, "Client-side error, not reported");
            return None;
        }

        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Storefront error"
        );
        Some(event_id)
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for buyer actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Increased quantity", Some(&[("product_id", "p9")]));
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
