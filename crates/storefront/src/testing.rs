//! Scripted in-memory backend and recording sinks for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use trumall_core::{
    Address, AddressId, AddressInput, CartLine, CartLineId, Cents, CheckoutRequest,
    CheckoutRequestId, CheckoutSession, OrderId, PaymentStatus, ProductId, ShippingMethod,
    ShippingOption, ShippingQuote,
};

use crate::api::{ApiError, CommerceApi};
use crate::notify::{Destination, Navigator, Notification, NotificationLevel, Notifier};

pub fn line(id: &str, product: &str, price: i64, quantity: u32) -> CartLine {
    CartLine {
        id: CartLineId::new(id),
        product_id: ProductId::new(product),
        product_name: None,
        unit_price: Cents::new(price),
        quantity,
    }
}

pub fn address(id: &str, is_default: bool) -> Address {
    Address {
        id: AddressId::new(id),
        label: String::new(),
        street: "Moi Avenue".to_string(),
        city: "Nairobi".to_string(),
        state: String::new(),
        country: "Kenya".to_string(),
        postal_code: String::new(),
        is_default,
    }
}

pub fn session() -> CheckoutSession {
    CheckoutSession {
        order_id: OrderId::new("O1"),
        checkout_request_id: CheckoutRequestId::new("C1"),
        shipping_cost: Cents::new(300),
        estimated_delivery: NaiveDate::from_ymd_opt(2025, 1, 10),
    }
}

pub fn rejected(status: u16, server_message: Option<&str>) -> ApiError {
    ApiError::Api {
        status,
        message: server_message.unwrap_or("rejected").to_string(),
        server_message: server_message.map(str::to_string),
    }
}

pub fn network_error() -> ApiError {
    ApiError::Unexpected("connection reset".to_string())
}

#[derive(Default)]
struct FakeState {
    cart: Vec<CartLine>,
    fail_cart: Option<(u16, Option<String>)>,
    addresses: Vec<Address>,
    fail_addresses: bool,
    shipping: Option<Vec<ShippingOption>>,
    quote_cost: i64,
    checkout: Option<Result<CheckoutSession, (u16, Option<String>)>>,
    statuses: VecDeque<Result<PaymentStatus, ()>>,
    status_delay: Option<Duration>,
    calls: Vec<String>,
}

/// A `CommerceApi` that answers from in-memory state and records every call.
///
/// Payment status answers are consumed from a script; once it is exhausted
/// every call reports `pending`.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cart(self, lines: Vec<CartLine>) -> Self {
        self.state.lock().unwrap().cart = lines;
        self
    }

    pub fn with_addresses(self, addresses: Vec<Address>) -> Self {
        self.state.lock().unwrap().addresses = addresses;
        self
    }

    pub fn with_shipping(self, options: Vec<ShippingOption>) -> Self {
        self.state.lock().unwrap().shipping = Some(options);
        self
    }

    pub fn with_quote_cost(self, cents: i64) -> Self {
        self.state.lock().unwrap().quote_cost = cents;
        self
    }

    pub fn with_checkout(self, session: CheckoutSession) -> Self {
        self.state.lock().unwrap().checkout = Some(Ok(session));
        self
    }

    pub fn with_checkout_error(self, status: u16, server_message: Option<&str>) -> Self {
        self.state.lock().unwrap().checkout =
            Some(Err((status, server_message.map(str::to_string))));
        self
    }

    pub fn with_statuses(self, statuses: impl IntoIterator<Item = PaymentStatus>) -> Self {
        self.state
            .lock()
            .unwrap()
            .statuses
            .extend(statuses.into_iter().map(Ok));
        self
    }

    /// Queue a transient failure for the next status call.
    pub fn with_status_error(self) -> Self {
        self.state.lock().unwrap().statuses.push_back(Err(()));
        self
    }

    pub fn with_status_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().status_delay = Some(delay);
        self
    }

    pub fn fail_cart(&self, status: u16, server_message: Option<&str>) {
        self.state.lock().unwrap().fail_cart = Some((status, server_message.map(str::to_string)));
    }

    pub fn fail_addresses(&self) {
        self.state.lock().unwrap().fail_addresses = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == name)
            .count()
    }

    pub fn server_cart(&self) -> Vec<CartLine> {
        self.state.lock().unwrap().cart.clone()
    }

    /// Replace the server-side cart without going through the API.
    pub fn set_server_cart(&self, lines: Vec<CartLine>) {
        self.state.lock().unwrap().cart = lines;
    }

    fn record(&self, name: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(name.to_string());
        if name.starts_with("cart") {
            if let Some((status, message)) = &state.fail_cart {
                return Err(rejected(*status, message.as_deref()));
            }
        }
        if name.starts_with("address") && state.fail_addresses {
            return Err(rejected(500, None));
        }
        Ok(())
    }

    fn bump(&self, product_id: &ProductId, delta: i64) -> Vec<CartLine> {
        let mut state = self.state.lock().unwrap();
        for line in &mut state.cart {
            if &line.product_id == product_id {
                let next = i64::from(line.quantity) + delta;
                line.quantity = u32::try_from(next.max(0)).unwrap();
            }
        }
        state.cart.retain(|l| l.quantity > 0);
        state.cart.clone()
    }
}

#[async_trait]
impl CommerceApi for FakeApi {
    async fn get_cart(&self) -> Result<Vec<CartLine>, ApiError> {
        self.record("cart.get")?;
        Ok(self.server_cart())
    }

    async fn add_to_cart(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        self.record("cart.add")?;
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.cart.iter_mut().find(|l| &l.product_id == product_id) {
            existing.quantity += quantity;
        } else {
            let id = format!("l{}", state.cart.len() + 1);
            state.cart.push(line(&id, product_id.as_str(), 1000, quantity));
        }
        Ok(())
    }

    async fn increase_quantity(&self, product_id: &ProductId) -> Result<Vec<CartLine>, ApiError> {
        self.record("cart.increase")?;
        Ok(self.bump(product_id, 1))
    }

    async fn decrease_quantity(&self, product_id: &ProductId) -> Result<Vec<CartLine>, ApiError> {
        self.record("cart.decrease")?;
        Ok(self.bump(product_id, -1))
    }

    async fn remove_line(&self, line_id: &CartLineId) -> Result<(), ApiError> {
        self.record("cart.remove")?;
        self.state.lock().unwrap().cart.retain(|l| &l.id != line_id);
        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.record("cart.clear")?;
        self.state.lock().unwrap().cart.clear();
        Ok(())
    }

    async fn list_addresses(&self) -> Result<Vec<Address>, ApiError> {
        self.record("address.list")?;
        Ok(self.state.lock().unwrap().addresses.clone())
    }

    async fn create_address(&self, input: &AddressInput) -> Result<Address, ApiError> {
        self.record("address.create")?;
        let mut state = self.state.lock().unwrap();
        let created = Address {
            id: AddressId::new(format!("a{}", state.addresses.len() + 1)),
            label: input.label.clone(),
            street: input.street.clone(),
            city: input.city.clone(),
            state: input.state.clone(),
            country: input.country.clone(),
            postal_code: input.postal_code.clone(),
            is_default: input.is_default,
        };
        state.addresses.push(created.clone());
        Ok(created)
    }

    async fn update_address(
        &self,
        id: &AddressId,
        input: &AddressInput,
    ) -> Result<Address, ApiError> {
        self.record("address.update")?;
        let mut state = self.state.lock().unwrap();
        let existing = state
            .addresses
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| rejected(404, Some("Address not found")))?;
        existing.street.clone_from(&input.street);
        existing.city.clone_from(&input.city);
        Ok(existing.clone())
    }

    async fn delete_address(&self, id: &AddressId) -> Result<(), ApiError> {
        self.record("address.delete")?;
        self.state.lock().unwrap().addresses.retain(|a| &a.id != id);
        Ok(())
    }

    async fn set_default_address(&self, id: &AddressId) -> Result<(), ApiError> {
        self.record("address.default")?;
        for address in &mut self.state.lock().unwrap().addresses {
            address.is_default = &address.id == id;
        }
        Ok(())
    }

    async fn shipping_methods(
        &self,
        _address_id: &AddressId,
    ) -> Result<Vec<ShippingOption>, ApiError> {
        self.record("shipping.methods")?;
        self.state
            .lock()
            .unwrap()
            .shipping
            .clone()
            .ok_or_else(|| rejected(500, None))
    }

    async fn calculate_shipping(
        &self,
        _address_id: &AddressId,
        method: ShippingMethod,
    ) -> Result<ShippingQuote, ApiError> {
        self.record("shipping.calculate")?;
        let cost = self.state.lock().unwrap().quote_cost;
        Ok(ShippingQuote {
            method,
            cost: Cents::new(cost),
            estimated_delivery: NaiveDate::from_ymd_opt(2025, 1, 10),
            is_free_shipping: cost == 0,
        })
    }

    async fn checkout(&self, _request: &CheckoutRequest) -> Result<CheckoutSession, ApiError> {
        self.record("checkout")?;
        match self.state.lock().unwrap().checkout.clone() {
            Some(Ok(session)) => Ok(session),
            Some(Err((status, message))) => Err(rejected(status, message.as_deref())),
            None => Ok(session()),
        }
    }

    async fn payment_status(
        &self,
        _order_id: &OrderId,
        _checkout_request_id: &CheckoutRequestId,
    ) -> Result<PaymentStatus, ApiError> {
        self.record("payment.status")?;
        let (next, delay) = {
            let mut state = self.state.lock().unwrap();
            (state.statuses.pop_front(), state.status_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match next {
            Some(Ok(status)) => Ok(status),
            Some(Err(())) => Err(network_error()),
            None => Ok(PaymentStatus::Pending),
        }
    }
}

/// Collects notifications for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

/// Collects navigation requests for assertions.
#[derive(Default)]
pub struct RecordingNavigator {
    seen: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn destinations(&self) -> Vec<Destination> {
        self.seen.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: Destination) {
        self.seen.lock().unwrap().push(destination);
    }
}
