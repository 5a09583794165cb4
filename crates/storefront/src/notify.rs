//! Buyer-facing notifications and navigation.
//!
//! The storefront components never render anything themselves. They report
//! through a [`Notifier`] and move the buyer on through a [`Navigator`], both
//! injected as trait objects so a UI layer (or a test) can observe them.

use std::fmt;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

impl NotificationLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transient message for the buyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }
}

/// Sink for buyer-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                tracing::warn!(level = %notification.level, "{}", notification.message);
            }
            NotificationLevel::Success | NotificationLevel::Info => {
                tracing::info!(level = %notification.level, "{}", notification.message);
            }
        }
    }
}

/// Places the buyer can be sent after a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    OrderHistory,
}

impl Destination {
    /// Route path of the destination.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::OrderHistory => "/orders",
        }
    }
}

/// Moves the buyer to another screen.
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// Logs navigation requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, destination: Destination) {
        tracing::info!(path = destination.path(), "Navigate");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_level() {
        assert_eq!(Notification::success("ok").level, NotificationLevel::Success);
        assert_eq!(Notification::error("no").level, NotificationLevel::Error);
        assert_eq!(Notification::info("hm").message, "hm");
    }

    #[test]
    fn test_order_history_path() {
        assert_eq!(Destination::OrderHistory.path(), "/orders");
    }
}
