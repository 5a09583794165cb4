//! The checkout state machine.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──accepted──▶ Polling ──paid────▶ Succeeded
//!  ▲                  │                       │ ├────failed──▶ Failed
//!  └──error───────────┘                       │ └──ceiling───▶ TimedOut
//!  └──dismiss─────────────────────────────────┘
//! ```
//!
//! Only one checkout may be submitting or polling at a time; a second
//! `submit` is refused with [`CheckoutError::InProgress`]. The check and the
//! move to `Submitting` happen in a single `watch` update so two callers can
//! never both get in.
//!
//! Dismissing the checkout cancels an in-flight poll. Dropping a
//! [`CheckoutTask`] does the same, so a torn-down screen never receives a late
//! outcome.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, instrument};
use trumall_core::{CheckoutSession, OrderId};

use crate::api::CommerceApi;
use crate::cart::CartStore;
use crate::checkout::{CheckoutForm, CheckoutInitiator};
use crate::error::{AppError, CheckoutError};
use crate::notify::{Navigator, Notifier};
use crate::outcome::OutcomeHandler;
use crate::payment::{PaymentPoller, PollOutcome, PollPolicy};

/// Where the checkout currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    Submitting,
    /// STK push sent; waiting for the buyer to approve it.
    Polling { session: CheckoutSession },
    Succeeded { order_id: OrderId },
    Failed { order_id: OrderId },
    /// Outcome unknown: the payment may still have gone through.
    TimedOut { order_id: OrderId },
}

impl CheckoutState {
    /// Whether a checkout is submitting or awaiting confirmation.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Submitting | Self::Polling { .. })
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Failed { .. } | Self::TimedOut { .. }
        )
    }
}

/// Drives one checkout at a time from submission to outcome.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CheckoutFlow {
    inner: Arc<FlowInner>,
}

struct FlowInner {
    cart: Arc<CartStore>,
    initiator: CheckoutInitiator,
    poller: PaymentPoller,
    outcome: OutcomeHandler,
    state: watch::Sender<CheckoutState>,
    active: Mutex<Option<CancellationToken>>,
}

impl CheckoutFlow {
    pub fn new(
        api: Arc<dyn CommerceApi>,
        cart: Arc<CartStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        policy: PollPolicy,
    ) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);
        Self {
            inner: Arc::new(FlowInner {
                initiator: CheckoutInitiator::new(api.clone(), notifier.clone()),
                poller: PaymentPoller::new(api, policy),
                outcome: OutcomeHandler::new(cart.clone(), notifier, navigator),
                cart,
                state,
                active: Mutex::new(None),
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.inner.state.borrow().clone()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.inner.state.subscribe()
    }

    /// Run a checkout to completion on the current task.
    ///
    /// # Errors
    ///
    /// `CheckoutError::InProgress` if another checkout is running, otherwise
    /// the validation or submission error. Payment outcomes are not errors.
    pub async fn submit(&self, form: &CheckoutForm) -> Result<PollOutcome, CheckoutError> {
        self.run(form, CancellationToken::new()).await
    }

    /// Run a checkout in the background.
    ///
    /// Dropping the returned task cancels it.
    #[must_use]
    pub fn spawn(&self, form: CheckoutForm) -> CheckoutTask {
        let cancel = CancellationToken::new();
        let flow = self.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { flow.run(&form, token).await });

        CheckoutTask {
            handle,
            cancel: cancel.clone(),
            _guard: cancel.drop_guard(),
        }
    }

    /// Close the checkout.
    ///
    /// Cancels a poll in progress and returns a finished checkout to `Idle`.
    /// Returns whether an active checkout was cancelled.
    pub fn dismiss(&self) -> bool {
        let active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let cancelled = if let Some(token) = active {
            token.cancel();
            true
        } else {
            false
        };

        self.inner.state.send_if_modified(|state| {
            if state.is_terminal() {
                *state = CheckoutState::Idle;
                true
            } else {
                false
            }
        });

        debug!(cancelled, "Checkout dismissed");
        cancelled
    }

    #[instrument(skip(self, form, cancel))]
    async fn run(
        &self,
        form: &CheckoutForm,
        cancel: CancellationToken,
    ) -> Result<PollOutcome, CheckoutError> {
        let entered = self.inner.state.send_if_modified(|state| {
            if state.is_busy() {
                return false;
            }
            // Published under the state lock so a dismiss that sees a busy
            // state always finds the token
            *self.inner.active.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(cancel.clone());
            *state = CheckoutState::Submitting;
            true
        });
        if !entered {
            debug!("Checkout already in progress");
            return Err(CheckoutError::InProgress);
        }

        let mut attempt = Attempt::held(&self.inner);

        if cancel.is_cancelled() {
            return Ok(attempt.finish(CheckoutState::Idle, PollOutcome::Cancelled { attempts: 0 }));
        }

        let cart = self.inner.cart.snapshot().await;
        let session = match self.inner.initiator.submit(form, &cart).await {
            Ok(session) => session,
            Err(e) => {
                attempt.finish(CheckoutState::Idle, ());
                return Err(e);
            }
        };

        // Dismissed while the request was in flight: the push is out but
        // nobody is waiting for it.
        if cancel.is_cancelled() {
            return Ok(attempt.finish(CheckoutState::Idle, PollOutcome::Cancelled { attempts: 0 }));
        }

        let order_id = session.order_id.clone();
        self.inner.state.send_replace(CheckoutState::Polling {
            session: session.clone(),
        });

        let outcome = self.inner.poller.poll(&session, &cancel).await;
        self.inner.outcome.handle(outcome).await;

        let next = match outcome {
            PollOutcome::Paid { .. } => CheckoutState::Succeeded { order_id },
            PollOutcome::Failed { .. } => CheckoutState::Failed { order_id },
            PollOutcome::TimedOut { .. } => CheckoutState::TimedOut { order_id },
            PollOutcome::Cancelled { .. } => CheckoutState::Idle,
        };
        Ok(attempt.finish(next, outcome))
    }
}

/// Owns the active-attempt slot; resets to `Idle` if the attempt is dropped
/// before it finishes.
struct Attempt<'a> {
    inner: &'a FlowInner,
    finished: bool,
}

impl<'a> Attempt<'a> {
    /// Take over an active slot already filled by `run`.
    const fn held(inner: &'a FlowInner) -> Self {
        Self {
            inner,
            finished: false,
        }
    }

    fn finish<T>(&mut self, state: CheckoutState, value: T) -> T {
        self.release();
        self.inner.state.send_replace(state);
        self.finished = true;
        value
    }

    fn release(&self) {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.release();
            self.inner.state.send_replace(CheckoutState::Idle);
        }
    }
}

/// A checkout running on its own task. Dropping it cancels the checkout.
pub struct CheckoutTask {
    handle: JoinHandle<Result<PollOutcome, CheckoutError>>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl CheckoutTask {
    /// Cancel without waiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the checkout to finish.
    ///
    /// # Errors
    ///
    /// The checkout's own error, or `AppError::Internal` if the task panicked.
    pub async fn join(self) -> Result<PollOutcome, AppError> {
        let Self { handle, _guard, .. } = self;
        match handle.await {
            Ok(result) => result.map_err(AppError::from),
            Err(e) => Err(AppError::Internal(format!("checkout task failed: {e}"))),
        }
    }
}
