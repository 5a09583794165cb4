//! Wire types for the Trumall REST API.
//!
//! These mirror the JSON the backend actually emits (which mixes Go field
//! names like `ID` with snake_case tags) and convert into the clean domain
//! types in `trumall_core`.

use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use trumall_core::{
    Address, CartLine, CartLineId, Cents, CheckoutRequestId, CheckoutSession, OrderId, PaymentStatus,
    ProductId, ShippingMethod, ShippingOption, ShippingQuote,
};

// =============================================================================
// Cart
// =============================================================================

/// A cart row as returned by `GET /cart` and the increase/decrease endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItemRecord {
    #[serde(alias = "ID")]
    pub id: String,
    #[serde(alias = "ProductID")]
    pub product_id: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, alias = "unit_price", alias = "price_cents")]
    pub price: Option<i64>,
    #[serde(default, alias = "Product")]
    pub product: Option<ProductRecord>,
}

/// The product preloaded into a cart row.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
}

impl From<CartItemRecord> for CartLine {
    fn from(record: CartItemRecord) -> Self {
        let product_name = record.product.as_ref().and_then(|p| p.title.clone());
        let unit_price = record
            .price
            .or_else(|| record.product.as_ref().and_then(|p| p.price_cents))
            .unwrap_or(0);

        Self {
            id: CartLineId::new(record.id),
            product_id: ProductId::new(record.product_id),
            product_name,
            unit_price: Cents::new(unit_price),
            quantity: u32::try_from(record.quantity).unwrap_or(0),
        }
    }
}

/// Body for `POST /cart/add`.
#[derive(Debug, Serialize)]
pub struct AddToCartBody<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// Body for `POST /cart/increase` and `POST /cart/decrease`.
#[derive(Debug, Serialize)]
pub struct ProductBody<'a> {
    pub product_id: &'a ProductId,
}

// =============================================================================
// Addresses
// =============================================================================

/// `GET /addresses` returns either a bare array or `{ "addresses": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AddressListResponse {
    List(Vec<Address>),
    Wrapped {
        #[serde(default)]
        addresses: Vec<Address>,
    },
}

impl AddressListResponse {
    pub fn into_vec(self) -> Vec<Address> {
        match self {
            Self::List(list) | Self::Wrapped { addresses: list } => list,
        }
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Response of `GET /shipping/methods`.
#[derive(Debug, Deserialize)]
pub struct ShippingMethodsResponse {
    #[serde(default)]
    pub shipping_methods: Vec<ShippingCalculationRecord>,
}

/// A shipping calculation as produced by the backend for both the methods
/// listing and `POST /shipping/calculate`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingCalculationRecord {
    pub method_code: String,
    #[serde(default)]
    pub method_name: String,
    #[serde(default)]
    pub shipping_cost_cents: i64,
    #[serde(default, deserialize_with = "deserialize_delivery_date")]
    pub estimated_delivery: Option<NaiveDate>,
    #[serde(default)]
    pub delivery_days_min: u32,
    #[serde(default)]
    pub delivery_days_max: u32,
    #[serde(default)]
    pub is_free_shipping: bool,
}

impl ShippingCalculationRecord {
    /// Convert to a domain option, or `None` for a method code this client
    /// does not know.
    pub fn into_option(self) -> Option<ShippingOption> {
        let method = self.method_code.parse::<ShippingMethod>().ok()?;
        let name = if self.method_name.is_empty() {
            method.code().to_string()
        } else {
            self.method_name
        };
        Some(ShippingOption {
            method,
            name,
            delivery_days_min: self.delivery_days_min,
            delivery_days_max: self.delivery_days_max,
            is_free_shipping: self.is_free_shipping,
        })
    }

    /// Convert to a quote, or `None` for an unknown method code.
    pub fn into_quote(self) -> Option<ShippingQuote> {
        let method = self.method_code.parse::<ShippingMethod>().ok()?;
        Some(ShippingQuote {
            method,
            cost: Cents::new(self.shipping_cost_cents),
            estimated_delivery: self.estimated_delivery,
            is_free_shipping: self.is_free_shipping,
        })
    }
}

/// Body for `POST /shipping/calculate`.
#[derive(Debug, Serialize)]
pub struct ShippingCalculateBody<'a> {
    pub address_id: &'a trumall_core::AddressId,
    pub shipping_method: ShippingMethod,
}

// =============================================================================
// Checkout & Payments
// =============================================================================

/// Response of `POST /cart/checkout`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub checkout_request_id: String,
    /// The orders column defaults to 0, so a missing value means free.
    #[serde(default)]
    pub shipping_cost_cents: i64,
    #[serde(default, deserialize_with = "deserialize_delivery_date")]
    pub estimated_delivery: Option<NaiveDate>,
}

impl From<CheckoutResponse> for CheckoutSession {
    fn from(response: CheckoutResponse) -> Self {
        Self {
            order_id: OrderId::new(response.order_id),
            checkout_request_id: CheckoutRequestId::new(response.checkout_request_id),
            shipping_cost: Cents::new(response.shipping_cost_cents),
            estimated_delivery: response.estimated_delivery,
        }
    }
}

/// Response of `GET /payments/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusResponse {
    #[serde(default)]
    pub status: PaymentStatus,
}

/// Query string of `GET /payments/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusQuery<'a> {
    pub order_id: &'a OrderId,
    pub checkout_request_id: &'a CheckoutRequestId,
}

/// Error body the backend sends on failures: `{ "error": "..." }`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Accept `2025-01-10`, an RFC 3339 timestamp, an empty string or null.
///
/// Go's zero `time.Time` (`0001-01-01T00:00:00Z`) means "not set".
fn deserialize_delivery_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let raw = raw.trim();

    let date = match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.date_naive())
            .map_err(|e| {
                serde::de::Error::custom(format!("invalid estimated_delivery '{raw}': {e}"))
            })?,
    };
    Ok((date.year() > 1).then_some(date))
}
