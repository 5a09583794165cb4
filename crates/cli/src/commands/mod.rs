//! Subcommand implementations.

pub mod address;
pub mod cart;
pub mod checkout;
pub mod shipping;

use trumall_core::{Address, AddressId, Cart, Cents, CurrencyCode, Money, default_selection};
use trumall_storefront::Storefront;
use trumall_storefront::error::AppError;

/// Use the given address, or the buyer's default one.
pub async fn resolve_address(
    storefront: &Storefront,
    requested: Option<String>,
) -> Result<AddressId, AppError> {
    if let Some(id) = requested {
        return Ok(AddressId::new(id));
    }

    let addresses = storefront.addresses.list().await?;
    default_selection(&addresses)
        .map(|a| a.id.clone())
        .ok_or_else(|| {
            AppError::BadRequest(
                "No saved delivery address; add one with `tm-cli address add`".to_string(),
            )
        })
}

pub fn money(cents: Cents, currency: CurrencyCode) -> Money {
    Money::new(cents, currency)
}

#[allow(clippy::print_stdout)]
pub fn print_cart(cart: &Cart, currency: CurrencyCode) {
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }

    for line in cart.lines() {
        let name = line
            .product_name
            .as_deref()
            .unwrap_or_else(|| line.product_id.as_str());
        println!(
            "{:<12} {:<32} {:>3} x {:>14} = {:>14}",
            line.id,
            name,
            line.quantity,
            money(line.unit_price, currency),
            money(line.line_total(), currency),
        );
    }
    println!(
        "Subtotal: {} ({} items)",
        money(cart.subtotal(), currency),
        cart.item_count()
    );
}

#[allow(clippy::print_stdout)]
pub fn print_addresses(addresses: &[Address]) {
    if addresses.is_empty() {
        println!("No saved addresses");
        return;
    }

    for address in addresses {
        let marker = if address.is_default { "*" } else { " " };
        println!("{marker} {:<12} {}", address.id, address.summary());
    }
}
