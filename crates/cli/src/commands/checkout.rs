//! `tm-cli checkout`
//!
//! Validates and submits the checkout, then waits for the buyer to approve
//! the STK push. Ctrl+C dismisses the checkout and stops polling.

use std::pin::pin;

use clap::Args;
use trumall_core::{Cents, PaymentMethod, ShippingMethod};
use trumall_storefront::Storefront;
use trumall_storefront::checkout::CheckoutForm;
use trumall_storefront::config::StorefrontConfig;
use trumall_storefront::error::{AppError, add_breadcrumb};
use trumall_storefront::flow::CheckoutState;
use trumall_storefront::payment::PollOutcome;
use trumall_storefront::shipping::preferred;

use super::{money, resolve_address};

#[derive(Args)]
pub struct CheckoutArgs {
    /// M-Pesa phone number (0712345678, +254712345678 or 254712345678)
    #[arg(long)]
    phone: String,

    /// Delivery address ID (defaults to the default address)
    #[arg(long)]
    address: Option<String>,

    /// `standard` or `express` (defaults to standard when offered)
    #[arg(long)]
    method: Option<ShippingMethod>,

    /// Payment method
    #[arg(long, default_value = "mpesa")]
    payment: PaymentMethod,
}

#[allow(clippy::print_stdout)]
pub async fn run(
    storefront: &Storefront,
    config: &StorefrontConfig,
    args: CheckoutArgs,
) -> Result<(), AppError> {
    let cart = storefront.cart.fetch().await?;
    let address_id = resolve_address(storefront, args.address).await?;

    let options = storefront
        .shipping
        .methods_for(&address_id, cart.subtotal())
        .await;
    let method = args
        .method
        .or_else(|| preferred(&options).map(|o| o.method))
        .unwrap_or_default();

    let shipping_cost = match storefront.shipping.quote(&address_id, method).await {
        Ok(quote) => quote.cost,
        // The server prices shipping again at checkout
        Err(_) => Cents::ZERO,
    };

    let total = cart.subtotal().saturating_add(shipping_cost);
    println!(
        "Subtotal {}  Shipping {}  Total {}",
        money(cart.subtotal(), config.currency),
        money(shipping_cost, config.currency),
        money(total, config.currency),
    );

    let form = CheckoutForm {
        payment_method: Some(args.payment),
        phone: args.phone,
        address_id: Some(address_id),
        shipping_method: Some(method),
        shipping_cost,
    };

    add_breadcrumb("checkout", "CLI checkout started", None);
    let task = storefront.checkout.spawn(form);
    println!("Waiting for payment confirmation (Ctrl+C to stop waiting)...");

    let mut join = pin!(task.join());
    let outcome = tokio::select! {
        result = &mut join => result?,
        _ = tokio::signal::ctrl_c() => {
            storefront.checkout.dismiss();
            join.await?
        }
    };

    match outcome {
        PollOutcome::Paid { .. } => {
            if let CheckoutState::Succeeded { order_id } = storefront.checkout.state() {
                println!("Order {order_id} paid");
            }
            Ok(())
        }
        PollOutcome::Failed { .. } => Err(AppError::PaymentIncomplete(
            "payment failed".to_string(),
        )),
        PollOutcome::TimedOut { attempts } => Err(AppError::PaymentIncomplete(format!(
            "no confirmation after {attempts} checks; check your M-Pesa statement"
        ))),
        PollOutcome::Cancelled { .. } => Err(AppError::PaymentIncomplete(
            "stopped waiting for confirmation".to_string(),
        )),
    }
}
