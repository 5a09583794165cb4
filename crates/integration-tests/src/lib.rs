//! Integration tests for the Trumall storefront client.
//!
//! Each test starts a `wiremock` server standing in for the Trumall REST API
//! and drives the real `HttpApi` against it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p trumall-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart` - cart store over HTTP
//! - `checkout` - submission, polling and outcomes end to end
//! - `addresses_shipping` - address book and shipping options

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Value, json};
use trumall_storefront::Storefront;
use trumall_storefront::api::HttpApi;
use trumall_storefront::config::StorefrontConfig;
use trumall_storefront::notify::{
    Destination, Navigator, Notification, NotificationLevel, Notifier,
};
use trumall_storefront::payment::PollPolicy;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

/// Bearer token the mock server expects.
pub const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.tEsT9kQ2mX7pLr4v";

/// Poll interval used by tests; short so timeouts resolve quickly.
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A storefront wired to a fresh mock server.
pub struct TestContext {
    pub server: MockServer,
    pub storefront: Storefront,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
}

impl TestContext {
    /// Start a mock server and connect a storefront to it.
    ///
    /// # Panics
    ///
    /// If the client cannot be built for the mock server URL.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let config = StorefrontConfig::new(&server.uri(), TOKEN)
            .map(|c| c.with_poll_policy(PollPolicy::new(TEST_POLL_INTERVAL, 20)))
            .unwrap_or_else(|e| panic!("mock server URL rejected: {e}"));
        let api = HttpApi::new(&config).unwrap_or_else(|e| panic!("client build failed: {e}"));

        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let storefront =
            Storefront::with_parts(Arc::new(api), notifier.clone(), navigator.clone(), &config);

        Self {
            server,
            storefront,
            notifier,
            navigator,
        }
    }

    /// Requests received for `path`, in arrival order.
    pub async fn requests_to(&self, path: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == path)
            .collect()
    }
}

/// A cart row in the backend's shape.
#[must_use]
pub fn cart_row(id: &str, product_id: &str, price: i64, quantity: u32) -> Value {
    json!({
        "ID": id,
        "UserID": "u1",
        "ProductID": product_id,
        "quantity": quantity,
        "price": price,
        "Product": { "id": product_id, "title": format!("Product {product_id}"), "price_cents": price }
    })
}

/// One scripted answer from the payment status endpoint.
#[derive(Debug, Clone, Copy)]
pub enum StatusReply {
    Status(&'static str),
    ServerError,
}

/// Answers status polls from a script; repeats the last entry once the
/// script runs out.
#[derive(Clone)]
pub struct StatusSequence {
    replies: Arc<Vec<StatusReply>>,
    calls: Arc<AtomicUsize>,
}

impl StatusSequence {
    #[must_use]
    pub fn new(replies: Vec<StatusReply>) -> Self {
        Self {
            replies: Arc::new(replies),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shorthand for a script of plain statuses.
    #[must_use]
    pub fn of(statuses: &[&'static str]) -> Self {
        Self::new(statuses.iter().copied().map(StatusReply::Status).collect())
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Respond for StatusSequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .get(idx)
            .or_else(|| self.replies.last())
            .copied()
            .unwrap_or(StatusReply::Status("pending"));

        match reply {
            StatusReply::Status(status) => {
                ResponseTemplate::new(200).set_body_json(json!({ "status": status }))
            }
            StatusReply::ServerError => ResponseTemplate::new(502),
        }
    }
}

/// Collects notifications for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn all(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

/// Collects navigation requests for assertions.
#[derive(Default)]
pub struct RecordingNavigator {
    seen: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn destinations(&self) -> Vec<Destination> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: Destination) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(destination);
    }
}
