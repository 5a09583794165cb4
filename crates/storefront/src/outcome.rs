//! Reacting to the end of a payment.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cart::CartStore;
use crate::notify::{Destination, Navigator, Notification, Notifier};
use crate::payment::PollOutcome;

pub const PAYMENT_CONFIRMED: &str = "Payment confirmed successfully!";
pub const PAYMENT_FAILED: &str = "Payment failed. Please try again.";
pub const PAYMENT_TIMED_OUT: &str =
    "Payment confirmation timed out. Please check your M-Pesa statement.";

/// Applies the side effects of a finished poll.
///
/// Only a confirmed payment touches the cart. A timeout is reported as
/// ambiguous and nothing is reconciled: the buyer is pointed at their M-Pesa
/// statement.
pub struct OutcomeHandler {
    cart: Arc<CartStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl OutcomeHandler {
    pub fn new(
        cart: Arc<CartStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            cart,
            notifier,
            navigator,
        }
    }

    pub async fn handle(&self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Paid { attempts } => {
                info!(attempts, "Payment confirmed, clearing cart");
                if let Err(e) = self.cart.clear().await {
                    // The order is paid either way
                    warn!(error = %e, "Failed to clear cart after payment");
                }
                self.navigator.navigate(Destination::OrderHistory);
                self.notifier.notify(Notification::success(PAYMENT_CONFIRMED));
            }
            PollOutcome::Failed { attempts } => {
                info!(attempts, "Payment failed, cart kept");
                self.notifier.notify(Notification::error(PAYMENT_FAILED));
            }
            PollOutcome::TimedOut { attempts } => {
                warn!(attempts, "Payment outcome unknown after timeout, cart kept");
                self.notifier.notify(Notification::error(PAYMENT_TIMED_OUT));
            }
            PollOutcome::Cancelled { attempts } => {
                info!(attempts, "Checkout dismissed while awaiting payment");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::notify::NotificationLevel;
    use crate::testing::{FakeApi, RecordingNavigator, RecordingNotifier, line};

    struct Harness {
        api: FakeApi,
        cart: Arc<CartStore>,
        notifier: Arc<RecordingNotifier>,
        navigator: Arc<RecordingNavigator>,
        handler: OutcomeHandler,
    }

    async fn harness() -> Harness {
        let api = FakeApi::new().with_cart(vec![line("l1", "A", 5000, 2)]);
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let cart = Arc::new(CartStore::new(Arc::new(api.clone()), notifier.clone()));
        cart.fetch().await.unwrap();
        let handler = OutcomeHandler::new(cart.clone(), notifier.clone(), navigator.clone());
        Harness {
            api,
            cart,
            notifier,
            navigator,
            handler,
        }
    }

    #[tokio::test]
    async fn test_paid_clears_and_navigates() {
        let h = harness().await;

        h.handler.handle(PollOutcome::Paid { attempts: 3 }).await;

        assert!(h.cart.snapshot().await.is_empty());
        assert_eq!(h.api.count("cart.clear"), 1);
        assert_eq!(h.navigator.destinations(), vec![Destination::OrderHistory]);
        assert_eq!(h.notifier.last().unwrap(), Notification::success(PAYMENT_CONFIRMED));
    }

    #[tokio::test]
    async fn test_failed_keeps_cart() {
        let h = harness().await;

        h.handler.handle(PollOutcome::Failed { attempts: 1 }).await;

        assert_eq!(h.cart.snapshot().await.lines().len(), 1);
        assert_eq!(h.api.count("cart.clear"), 0);
        assert!(h.navigator.destinations().is_empty());
        assert_eq!(
            h.notifier.messages(NotificationLevel::Error),
            vec![PAYMENT_FAILED]
        );
    }

    #[tokio::test]
    async fn test_timeout_keeps_cart_and_points_to_statement() {
        let h = harness().await;

        h.handler.handle(PollOutcome::TimedOut { attempts: 20 }).await;

        assert_eq!(h.cart.snapshot().await.lines().len(), 1);
        assert!(h.navigator.destinations().is_empty());
        assert_eq!(
            h.notifier.messages(NotificationLevel::Error),
            vec![PAYMENT_TIMED_OUT]
        );
    }

    #[tokio::test]
    async fn test_cancelled_is_silent() {
        let h = harness().await;

        h.handler.handle(PollOutcome::Cancelled { attempts: 2 }).await;

        assert!(h.notifier.all().is_empty());
        assert!(h.navigator.destinations().is_empty());
    }

    #[tokio::test]
    async fn test_paid_still_navigates_when_clear_fails() {
        let h = harness().await;
        h.api.fail_cart(500, None);

        h.handler.handle(PollOutcome::Paid { attempts: 1 }).await;

        assert_eq!(h.navigator.destinations(), vec![Destination::OrderHistory]);
        assert_eq!(h.notifier.last().unwrap(), Notification::success(PAYMENT_CONFIRMED));
    }
}
