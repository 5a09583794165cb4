//! Cart line items.

use serde::{Deserialize, Serialize};

use super::id::{CartLineId, ProductId};
use super::price::Cents;

/// One product in the cart.
///
/// `quantity` is always at least 1; the server deletes a line when its
/// last unit is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Server-side line identifier (used for removal).
    pub id: CartLineId,
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Display name, when the API included the product record.
    pub product_name: Option<String>,
    /// Price of a single unit.
    pub unit_price: Cents,
    /// Number of units.
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Cents {
        self.unit_price.saturating_mul(self.quantity)
    }
}

/// A snapshot of the cart as last reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from server lines, dropping any zero-quantity rows.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self {
            lines: lines.into_iter().filter(|l| l.quantity > 0).collect(),
        }
    }

    /// Line items in server order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Cents {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// The line holding the given product, if any.
    #[must_use]
    pub fn line_for(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, product: &str, price: i64, quantity: u32) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            product_id: ProductId::new(product),
            product_name: None,
            unit_price: Cents::new(price),
            quantity,
        }
    }

    #[test]
    fn test_subtotal_and_count() {
        let cart = Cart::from_lines(vec![line("l1", "A", 5000, 2), line("l2", "B", 250, 3)]);
        assert_eq!(cart.subtotal(), Cents::new(10_750));
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_zero_quantity_lines_are_dropped() {
        let cart = Cart::from_lines(vec![line("l1", "A", 5000, 0)]);
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Cents::ZERO);
    }

    #[test]
    fn test_line_for() {
        let cart = Cart::from_lines(vec![line("l1", "A", 5000, 2)]);
        assert!(cart.line_for(&ProductId::new("A")).is_some());
        assert!(cart.line_for(&ProductId::new("B")).is_none());
    }
}
