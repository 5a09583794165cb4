//! `tm-cli cart ...`

use clap::Subcommand;
use trumall_core::{Cart, CartLineId, ProductId};
use trumall_storefront::Storefront;
use trumall_storefront::config::StorefrontConfig;
use trumall_storefront::error::AppError;

use super::print_cart;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        /// Product ID
        product_id: String,

        /// Number of units
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a line (by line ID, see `cart show`)
    Remove { line_id: String },
    /// Add one unit of a product
    Increase { product_id: String },
    /// Remove one unit of a product
    Decrease { product_id: String },
    /// Empty the cart
    Clear,
}

pub async fn run(
    storefront: &Storefront,
    config: &StorefrontConfig,
    action: CartAction,
) -> Result<(), AppError> {
    let cart = match action {
        CartAction::Show => storefront.cart.fetch().await?,
        CartAction::Add {
            product_id,
            quantity,
        } => {
            storefront
                .cart
                .add(&ProductId::new(product_id), quantity)
                .await?
        }
        CartAction::Remove { line_id } => storefront.cart.remove(&CartLineId::new(line_id)).await?,
        CartAction::Increase { product_id } => {
            storefront.cart.increase(&ProductId::new(product_id)).await?
        }
        CartAction::Decrease { product_id } => {
            storefront.cart.decrease(&ProductId::new(product_id)).await?
        }
        CartAction::Clear => {
            storefront.cart.clear().await?;
            Cart::empty()
        }
    };

    print_cart(&cart, config.currency);
    Ok(())
}
