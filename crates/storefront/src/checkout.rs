//! Checkout validation and submission.
//!
//! A checkout is validated entirely on the client before anything is sent, in
//! this order:
//!
//! 1. a payment method is selected
//! 2. the payment method is one this client can run (M-Pesa)
//! 3. the phone number matches the national M-Pesa format
//! 4. a delivery address is selected
//! 5. a shipping method is selected
//! 6. the cart is not empty
//! 7. subtotal plus shipping is at least [`Cents::MINIMUM_PAYABLE`]
//!
//! Only then is `POST /cart/checkout` called. The gateway rejects anything
//! below one currency unit, so the last check spares a guaranteed failure.

use std::sync::Arc;

use tracing::instrument;
use trumall_core::{
    AddressId, Cart, Cents, CheckoutRequest, CheckoutSession, PaymentMethod, PhoneNumber,
    ShippingMethod,
};

use crate::api::CommerceApi;
use crate::error::{CheckoutError, add_breadcrumb};
use crate::notify::{Notification, Notifier};

/// Message shown once the STK push is on its way.
pub const STK_PUSH_SENT: &str = "STK Push sent! Check your phone to complete payment.";

/// What the buyer entered on the checkout screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub payment_method: Option<PaymentMethod>,
    /// Raw phone input; normalised during validation.
    pub phone: String,
    pub address_id: Option<AddressId>,
    pub shipping_method: Option<ShippingMethod>,
    /// Shipping cost quoted for the selected address and method.
    pub shipping_cost: Cents,
}

impl CheckoutForm {
    /// An M-Pesa checkout with everything selected.
    pub fn mpesa(
        phone: impl Into<String>,
        address_id: AddressId,
        shipping_method: ShippingMethod,
        shipping_cost: Cents,
    ) -> Self {
        Self {
            payment_method: Some(PaymentMethod::Mpesa),
            phone: phone.into(),
            address_id: Some(address_id),
            shipping_method: Some(shipping_method),
            shipping_cost,
        }
    }

    /// Validate against the cart and build the request body.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure in checking order.
    pub fn validate(&self, cart: &Cart) -> Result<CheckoutRequest, CheckoutError> {
        let payment_method = self.payment_method.ok_or(CheckoutError::NoPaymentMethod)?;
        if !payment_method.is_supported() {
            return Err(CheckoutError::UnsupportedPaymentMethod);
        }

        let phone = PhoneNumber::parse(&self.phone).map_err(CheckoutError::InvalidPhone)?;
        let address_id = self.address_id.clone().ok_or(CheckoutError::NoAddress)?;
        let shipping_method = self.shipping_method.ok_or(CheckoutError::NoShippingMethod)?;

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let total = cart.subtotal().saturating_add(self.shipping_cost);
        if !total.is_payable() {
            return Err(CheckoutError::BelowMinimum { total });
        }

        Ok(CheckoutRequest {
            phone,
            address_id,
            shipping_method,
        })
    }
}

/// Validates checkouts and asks the server to send the STK push.
pub struct CheckoutInitiator {
    api: Arc<dyn CommerceApi>,
    notifier: Arc<dyn Notifier>,
}

impl CheckoutInitiator {
    pub fn new(api: Arc<dyn CommerceApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Validate `form` and submit it.
    ///
    /// The returned session carries the server's shipping cost and delivery
    /// date, which replace whatever was quoted earlier.
    ///
    /// # Errors
    ///
    /// A validation error (no request made) or `CheckoutError::Submission`.
    /// Either way the buyer has already been notified.
    #[instrument(skip(self, form, cart), fields(subtotal = %cart.subtotal()))]
    pub async fn submit(
        &self,
        form: &CheckoutForm,
        cart: &Cart,
    ) -> Result<CheckoutSession, CheckoutError> {
        let request = form.validate(cart).map_err(|e| {
            tracing::debug!(error = %e, "Checkout validation failed");
            self.notifier.notify(Notification::error(e.user_message()));
            e
        })?;

        add_breadcrumb(
            "checkout",
            "Submit checkout",
            Some(&[
                ("address_id", request.address_id.as_str()),
                ("shipping_method", request.shipping_method.code()),
            ]),
        );

        match self.api.checkout(&request).await {
            Ok(session) => {
                tracing::info!(
                    order_id = %session.order_id,
                    checkout_request_id = %session.checkout_request_id,
                    "STK push sent"
                );
                self.notifier.notify(Notification::info(STK_PUSH_SENT));
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Checkout submission failed");
                let err = CheckoutError::Submission(e);
                self.notifier.notify(Notification::error(err.user_message()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SUBMISSION_FALLBACK_MESSAGE;
    use crate::notify::NotificationLevel;
    use crate::testing::{FakeApi, RecordingNotifier, line};
    use trumall_core::PhoneError;

    fn cart(price: i64, quantity: u32) -> Cart {
        Cart::from_lines(vec![line("l1", "A", price, quantity)])
    }

    fn form() -> CheckoutForm {
        CheckoutForm::mpesa(
            "0712345678",
            AddressId::new("X"),
            ShippingMethod::Standard,
            Cents::new(300),
        )
    }

    fn initiator(api: &FakeApi) -> (CheckoutInitiator, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (
            CheckoutInitiator::new(Arc::new(api.clone()), notifier.clone()),
            notifier,
        )
    }

    #[test]
    fn test_valid_form_builds_normalised_request() {
        let request = form().validate(&cart(5000, 2)).unwrap();
        assert_eq!(request.phone.as_str(), "254712345678");
        assert_eq!(request.address_id, AddressId::new("X"));
        assert_eq!(request.shipping_method, ShippingMethod::Standard);
    }

    #[test]
    fn test_validation_order() {
        let empty = CheckoutForm::default();
        assert!(matches!(
            empty.validate(&Cart::empty()),
            Err(CheckoutError::NoPaymentMethod)
        ));

        let card = CheckoutForm {
            payment_method: Some(PaymentMethod::Card),
            ..CheckoutForm::default()
        };
        assert!(matches!(
            card.validate(&Cart::empty()),
            Err(CheckoutError::UnsupportedPaymentMethod)
        ));

        let bad_phone = CheckoutForm {
            phone: "0812345678".to_string(),
            ..form()
        };
        assert!(matches!(
            bad_phone.validate(&Cart::empty()),
            Err(CheckoutError::InvalidPhone(PhoneError::InvalidFormat))
        ));

        let no_address = CheckoutForm {
            address_id: None,
            ..form()
        };
        assert!(matches!(
            no_address.validate(&Cart::empty()),
            Err(CheckoutError::NoAddress)
        ));

        let no_shipping = CheckoutForm {
            shipping_method: None,
            ..form()
        };
        assert!(matches!(
            no_shipping.validate(&Cart::empty()),
            Err(CheckoutError::NoShippingMethod)
        ));

        assert!(matches!(
            form().validate(&Cart::empty()),
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[test]
    fn test_minimum_amount_boundary() {
        let free_shipping = |cost| CheckoutForm {
            shipping_cost: Cents::new(cost),
            ..form()
        };

        assert!(matches!(
            free_shipping(0).validate(&cart(99, 1)),
            Err(CheckoutError::BelowMinimum { total }) if total == Cents::new(99)
        ));
        assert!(matches!(
            free_shipping(49).validate(&cart(25, 2)),
            Err(CheckoutError::BelowMinimum { .. })
        ));
        assert!(free_shipping(0).validate(&cart(100, 1)).is_ok());
        assert!(free_shipping(1).validate(&cart(99, 1)).is_ok());
    }

    #[tokio::test]
    async fn test_below_minimum_never_calls_endpoint() {
        let api = FakeApi::new();
        let (initiator, notifier) = initiator(&api);

        for (price, shipping) in [(1, 0), (50, 49), (0, 99), (99, 0)] {
            let form = CheckoutForm {
                shipping_cost: Cents::new(shipping),
                ..form()
            };
            let result = initiator.submit(&form, &cart(price, 1)).await;
            assert!(matches!(result, Err(CheckoutError::BelowMinimum { .. })));
        }

        assert_eq!(api.count("checkout"), 0);
        assert_eq!(notifier.messages(NotificationLevel::Error).len(), 4);
    }

    #[tokio::test]
    async fn test_success_notifies_stk_push() {
        let api = FakeApi::new();
        let (initiator, notifier) = initiator(&api);

        let session = initiator.submit(&form(), &cart(5000, 2)).await.unwrap();

        assert_eq!(session.order_id.as_str(), "O1");
        assert_eq!(session.shipping_cost, Cents::new(300));
        assert_eq!(notifier.messages(NotificationLevel::Info), vec![STK_PUSH_SENT]);
    }

    #[tokio::test]
    async fn test_submission_error_uses_server_message() {
        let api = FakeApi::new().with_checkout_error(400, Some("Product out of stock"));
        let (initiator, notifier) = initiator(&api);

        let result = initiator.submit(&form(), &cart(5000, 2)).await;

        assert!(matches!(result, Err(CheckoutError::Submission(_))));
        assert_eq!(
            notifier.messages(NotificationLevel::Error),
            vec!["Product out of stock"]
        );
    }

    #[tokio::test]
    async fn test_submission_error_fallback() {
        let api = FakeApi::new().with_checkout_error(502, None);
        let (initiator, notifier) = initiator(&api);

        let _ = initiator.submit(&form(), &cart(5000, 2)).await;

        assert_eq!(
            notifier.messages(NotificationLevel::Error),
            vec![SUBMISSION_FALLBACK_MESSAGE]
        );
    }
}
