//! Cart state kept consistent with the server.
//!
//! The server owns the cart. [`CartStore`] holds the last snapshot it
//! reported and replaces it wholesale after each successful mutation, either
//! by refetching (`add`, `remove`) or by taking the snapshot the endpoint
//! returned (`increase`, `decrease`). A failed call leaves the local snapshot
//! as it was.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::instrument;
use trumall_core::{Cart, CartLine, CartLineId, Cents, ProductId};

use crate::api::{ApiError, CommerceApi};
use crate::error::{CartError, add_breadcrumb};
use crate::notify::{Notification, Notifier};

const FETCH_FAILED: &str = "Failed to load cart";
const UPDATE_FAILED: &str = "Failed to update cart";

/// Buyer's cart, shared by every screen of a session.
pub struct CartStore {
    api: Arc<dyn CommerceApi>,
    notifier: Arc<dyn Notifier>,
    cart: RwLock<Cart>,
    /// Serialises mutations so snapshots are applied in request order.
    mutation: Mutex<()>,
}

impl CartStore {
    pub fn new(api: Arc<dyn CommerceApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            cart: RwLock::new(Cart::empty()),
            mutation: Mutex::new(()),
        }
    }

    /// Current local snapshot.
    pub async fn snapshot(&self) -> Cart {
        self.cart.read().await.clone()
    }

    /// Subtotal of the current snapshot.
    pub async fn subtotal(&self) -> Cents {
        self.cart.read().await.subtotal()
    }

    /// Load the cart from the server. A missing cart is an empty one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the request fails; the local snapshot is
    /// left unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Cart, CartError> {
        let _guard = self.mutation.lock().await;
        self.refetch().await
    }

    /// Add `quantity` units of a product, then refetch.
    ///
    /// # Errors
    ///
    /// `CartError::InvalidQuantity` for a zero quantity (no request is made),
    /// `CartError::Api` if either request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: &ProductId, quantity: u32) -> Result<Cart, CartError> {
        if quantity == 0 {
            self.notifier
                .notify(Notification::error(CartError::InvalidQuantity.to_string()));
            return Err(CartError::InvalidQuantity);
        }

        let _guard = self.mutation.lock().await;
        add_breadcrumb("cart", "Add to cart", Some(&[("product_id", product_id.as_str())]));

        if let Err(e) = self.api.add_to_cart(product_id, quantity).await {
            return Err(self.fail(e, UPDATE_FAILED));
        }
        let cart = self.refetch().await?;
        self.notifier.notify(Notification::success("Added to cart"));
        Ok(cart)
    }

    /// Remove a line, then refetch.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if either request fails.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove(&self, line_id: &CartLineId) -> Result<Cart, CartError> {
        let _guard = self.mutation.lock().await;
        add_breadcrumb("cart", "Remove line", Some(&[("line_id", line_id.as_str())]));

        if let Err(e) = self.api.remove_line(line_id).await {
            return Err(self.fail(e, UPDATE_FAILED));
        }
        let cart = self.refetch().await?;
        self.notifier.notify(Notification::success("Item removed from cart"));
        Ok(cart)
    }

    /// Add one unit; the local cart becomes exactly the returned snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn increase(&self, product_id: &ProductId) -> Result<Cart, CartError> {
        let _guard = self.mutation.lock().await;
        add_breadcrumb("cart", "Increase quantity", Some(&[("product_id", product_id.as_str())]));

        match self.api.increase_quantity(product_id).await {
            Ok(lines) => Ok(self.apply(lines, "Cart updated").await),
            Err(e) => Err(self.fail(e, UPDATE_FAILED)),
        }
    }

    /// Remove one unit; the local cart becomes exactly the returned snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn decrease(&self, product_id: &ProductId) -> Result<Cart, CartError> {
        let _guard = self.mutation.lock().await;
        add_breadcrumb("cart", "Decrease quantity", Some(&[("product_id", product_id.as_str())]));

        match self.api.decrease_quantity(product_id).await {
            Ok(lines) => Ok(self.apply(lines, "Cart updated").await),
            Err(e) => Err(self.fail(e, UPDATE_FAILED)),
        }
    }

    /// Empty the remote cart and the local snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the request fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), CartError> {
        let _guard = self.mutation.lock().await;
        add_breadcrumb("cart", "Clear cart", None);

        if let Err(e) = self.api.clear_cart().await {
            return Err(self.fail(e, UPDATE_FAILED));
        }
        *self.cart.write().await = Cart::empty();
        self.notifier.notify(Notification::success("Cart cleared"));
        Ok(())
    }

    async fn refetch(&self) -> Result<Cart, CartError> {
        match self.api.get_cart().await {
            Ok(lines) => {
                let cart = Cart::from_lines(lines);
                self.cart.write().await.clone_from(&cart);
                tracing::debug!(lines = cart.lines().len(), "Cart refreshed");
                Ok(cart)
            }
            Err(e) => Err(self.fail(e, FETCH_FAILED)),
        }
    }

    async fn apply(&self, lines: Vec<CartLine>, message: &str) -> Cart {
        let cart = Cart::from_lines(lines);
        self.cart.write().await.clone_from(&cart);
        self.notifier.notify(Notification::success(message));
        cart
    }

    fn fail(&self, error: ApiError, fallback: &str) -> CartError {
        tracing::warn!(error = %error, "Cart request failed");
        let message = error.server_message().unwrap_or(fallback).to_string();
        self.notifier.notify(Notification::error(message));
        CartError::Api(error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::notify::NotificationLevel;
    use crate::testing::{FakeApi, RecordingNotifier, line};
    use pretty_assertions::assert_eq;

    fn store(api: &FakeApi) -> (CartStore, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (CartStore::new(Arc::new(api.clone()), notifier.clone()), notifier)
    }

    #[tokio::test]
    async fn test_fetch_replaces_snapshot() {
        let api = FakeApi::new().with_cart(vec![line("l1", "A", 5000, 2)]);
        let (store, _) = store(&api);

        let cart = store.fetch().await.unwrap();

        assert_eq!(cart.subtotal(), Cents::new(10_000));
        assert_eq!(store.snapshot().await, cart);
    }

    #[tokio::test]
    async fn test_increase_takes_returned_snapshot_exactly() {
        let api = FakeApi::new().with_cart(vec![line("l1", "A", 5000, 2)]);
        let (store, notifier) = store(&api);
        store.fetch().await.unwrap();

        // Server has moved on: another device added B
        api.set_server_cart(vec![line("l1", "A", 5000, 2), line("l2", "B", 100, 1)]);
        let cart = store.increase(&ProductId::new("A")).await.unwrap();

        assert_eq!(
            cart.lines(),
            &[line("l1", "A", 5000, 3), line("l2", "B", 100, 1)]
        );
        assert_eq!(store.snapshot().await, cart);
        assert_eq!(api.count("cart.get"), 1);
        assert_eq!(notifier.last().unwrap().level, NotificationLevel::Success);
    }

    #[tokio::test]
    async fn test_decrease_to_zero_drops_line() {
        let api = FakeApi::new().with_cart(vec![line("l1", "A", 5000, 1)]);
        let (store, _) = store(&api);
        store.fetch().await.unwrap();

        let cart = store.decrease(&ProductId::new("A")).await.unwrap();

        assert!(cart.is_empty());
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_refetches() {
        let api = FakeApi::new();
        let (store, notifier) = store(&api);

        let cart = store.add(&ProductId::new("A"), 2).await.unwrap();

        assert_eq!(cart.item_count(), 2);
        assert_eq!(api.calls(), vec!["cart.add", "cart.get"]);
        assert_eq!(notifier.messages(NotificationLevel::Success), vec!["Added to cart"]);
    }

    #[tokio::test]
    async fn test_add_zero_quantity_makes_no_request() {
        let api = FakeApi::new();
        let (store, notifier) = store(&api);

        let result = store.add(&ProductId::new("A"), 0).await;

        assert!(matches!(result, Err(CartError::InvalidQuantity)));
        assert!(api.calls().is_empty());
        assert_eq!(notifier.last().unwrap().level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn test_remove_refetches() {
        let api = FakeApi::new().with_cart(vec![line("l1", "A", 5000, 1), line("l2", "B", 100, 1)]);
        let (store, _) = store(&api);

        let cart = store.remove(&CartLineId::new("l1")).await.unwrap();

        assert_eq!(cart.lines(), &[line("l2", "B", 100, 1)]);
        assert_eq!(api.calls(), vec!["cart.remove", "cart.get"]);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_state() {
        let api = FakeApi::new().with_cart(vec![line("l1", "A", 5000, 2)]);
        let (store, notifier) = store(&api);
        let before = store.fetch().await.unwrap();

        api.fail_cart(409, Some("Out of stock"));
        let result = store.increase(&ProductId::new("A")).await;

        assert!(matches!(result, Err(CartError::Api(_))));
        assert_eq!(store.snapshot().await, before);
        assert_eq!(notifier.messages(NotificationLevel::Error), vec!["Out of stock"]);
        // Not retried
        assert_eq!(api.count("cart.increase"), 1);
    }

    #[tokio::test]
    async fn test_failure_without_server_message_uses_fallback() {
        let api = FakeApi::new();
        let (store, notifier) = store(&api);

        api.fail_cart(500, None);
        let _ = store.clear().await;

        assert_eq!(notifier.messages(NotificationLevel::Error), vec![UPDATE_FAILED]);
    }

    #[tokio::test]
    async fn test_clear_empties_local_state() {
        let api = FakeApi::new().with_cart(vec![line("l1", "A", 5000, 2)]);
        let (store, _) = store(&api);
        store.fetch().await.unwrap();

        store.clear().await.unwrap();

        assert!(store.snapshot().await.is_empty());
        assert!(api.server_cart().is_empty());
    }
}
