//! M-Pesa payment confirmation by polling.
//!
//! The gateway has no push channel to the buyer's client, so after the STK
//! push is sent the outcome is resolved by asking `GET /payments/status` on a
//! fixed interval until a terminal status arrives or the attempt ceiling is
//! passed.
//!
//! # Tick semantics
//!
//! - The first check happens one interval after polling starts.
//! - Checks are sequential: a slow status call delays the next tick instead of
//!   overlapping with it. A tick missed during a slow call fires as soon as
//!   the call returns.
//! - On each tick: once the ceiling of checks has been made the poll ends in
//!   [`PollOutcome::TimedOut`]; otherwise one check runs and `paid` ends in
//!   [`PollOutcome::Paid`], `failed` ends in [`PollOutcome::Failed`], and
//!   anything else keeps polling.
//! - A status call that errors is logged and the loop carries on.
//!
//! With the default policy (3 s, 20 attempts) at most 20 status calls are made
//! and a timeout is declared 63 seconds after the push.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use trumall_core::{CheckoutSession, PaymentStatus};

use crate::api::CommerceApi;

/// Default time between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of status checks before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// How often to check a payment and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Constant delay between checks.
    pub interval: Duration,
    /// Maximum number of status calls.
    pub max_attempts: u32,
}

impl PollPolicy {
    /// A zero interval is raised to one millisecond.
    #[must_use]
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            max_attempts,
        }
    }

    /// Worst-case time from the first tick wait until a timeout is declared.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts.saturating_add(1))
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_ATTEMPTS)
    }
}

/// How a polling loop ended. `attempts` counts status calls issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Paid { attempts: u32 },
    Failed { attempts: u32 },
    TimedOut { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl PollOutcome {
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Paid { attempts }
            | Self::Failed { attempts }
            | Self::TimedOut { attempts }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid { .. })
    }
}

/// Polls the payment status endpoint for one checkout session.
#[derive(Clone)]
pub struct PaymentPoller {
    api: Arc<dyn CommerceApi>,
    policy: PollPolicy,
}

impl PaymentPoller {
    pub fn new(api: Arc<dyn CommerceApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Poll until the payment is resolved, the ceiling is passed, or `cancel`
    /// fires.
    ///
    /// Cancellation is observed both while waiting for a tick and while a
    /// status call is in flight; the timer is dropped on every exit path.
    #[instrument(
        skip(self, session, cancel),
        fields(
            order_id = %session.order_id,
            checkout_request_id = %session.checkout_request_id,
        )
    )]
    pub async fn poll(&self, session: &CheckoutSession, cancel: &CancellationToken) -> PollOutcome {
        let interval = self.policy.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut calls: u32 = 0;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(attempts = calls, "Payment polling cancelled");
                    return PollOutcome::Cancelled { attempts: calls };
                }
                _ = ticker.tick() => {}
            }

            // The tick after the last allowed check ends the loop
            if calls >= self.policy.max_attempts {
                warn!(attempts = calls, "Payment confirmation timed out");
                return PollOutcome::TimedOut { attempts: calls };
            }

            calls = calls.saturating_add(1);
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(attempts = calls, "Payment polling cancelled during status check");
                    return PollOutcome::Cancelled { attempts: calls };
                }
                result = self.api.payment_status(&session.order_id, &session.checkout_request_id) => result,
            };

            match result {
                Ok(PaymentStatus::Paid) => {
                    info!(attempt = calls, "Payment confirmed");
                    return PollOutcome::Paid { attempts: calls };
                }
                Ok(PaymentStatus::Failed) => {
                    info!(attempt = calls, "Payment failed");
                    return PollOutcome::Failed { attempts: calls };
                }
                Ok(status) => {
                    debug!(attempt = calls, status = ?status, "Payment not yet resolved");
                }
                Err(e) => {
                    warn!(attempt = calls, error = %e, "Payment status check failed; retrying on next tick");
                }
            }
        }
    }
}
