//! `tm-cli shipping ...`

use clap::Subcommand;
use trumall_core::ShippingMethod;
use trumall_storefront::Storefront;
use trumall_storefront::config::StorefrontConfig;
use trumall_storefront::error::AppError;
use trumall_storefront::shipping::preferred;

use super::{money, resolve_address};

#[derive(Subcommand)]
pub enum ShippingAction {
    /// List delivery options for an address
    Methods {
        /// Address ID (defaults to the default address)
        #[arg(long)]
        address: Option<String>,
    },
    /// Price delivery of the current cart
    Quote {
        /// Address ID (defaults to the default address)
        #[arg(long)]
        address: Option<String>,

        /// `standard` or `express`
        #[arg(long, default_value = "standard")]
        method: ShippingMethod,
    },
}

#[allow(clippy::print_stdout)]
pub async fn run(
    storefront: &Storefront,
    config: &StorefrontConfig,
    action: ShippingAction,
) -> Result<(), AppError> {
    match action {
        ShippingAction::Methods { address } => {
            let address_id = resolve_address(storefront, address).await?;
            let subtotal = storefront.cart.fetch().await?.subtotal();
            let options = storefront.shipping.methods_for(&address_id, subtotal).await;
            let selected = preferred(&options).map(|o| o.method);

            for option in &options {
                let marker = if Some(option.method) == selected { "*" } else { " " };
                let free = if option.is_free_shipping { " (free)" } else { "" };
                println!(
                    "{marker} {:<10} {:<20} {}{free}",
                    option.method,
                    option.name,
                    option.delivery_window()
                );
            }
        }
        ShippingAction::Quote { address, method } => {
            let address_id = resolve_address(storefront, address).await?;
            let quote = storefront.shipping.quote(&address_id, method).await?;
            let delivery = quote
                .estimated_delivery
                .map_or_else(|| "unknown".to_string(), |d| d.to_string());
            println!(
                "{}: {} (estimated delivery {delivery})",
                quote.method,
                money(quote.cost, config.currency)
            );
        }
    }
    Ok(())
}
