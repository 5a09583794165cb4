//! Status and method enums shared by the checkout flow.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Payment status reported by the status endpoint.
///
/// `Pending` and any unrecognised value are non-terminal; `Paid` and
/// `Failed` end the confirmation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    /// Any value the client does not know about.
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Whether this status ends polling.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Delivery speed offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
}

impl ShippingMethod {
    /// Wire code used by the API.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Express => "express",
        }
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for ShippingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "express" => Ok(Self::Express),
            other => Err(format!("unknown shipping method: {other}")),
        }
    }
}

/// How the buyer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// M-Pesa STK push.
    Mpesa,
    /// Credit/debit card (not yet offered).
    Card,
}

impl PaymentMethod {
    /// Whether checkout can be started with this method.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::Mpesa)
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mpesa" | "m-pesa" => Ok(Self::Mpesa),
            "card" => Ok(Self::Card),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mpesa => write!(f, "mpesa"),
            Self::Card => write!(f, "card"),
        }
    }
}
