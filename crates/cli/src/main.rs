//! Trumall CLI - drive the cart and M-Pesa checkout from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! tm-cli cart show
//!
//! # Add two units of a product
//! tm-cli cart add 7f9c1e2a -q 2
//!
//! # List saved addresses
//! tm-cli address list
//!
//! # Pay for the cart with M-Pesa (Ctrl+C stops waiting for confirmation)
//! tm-cli checkout --phone 0712345678
//! ```
//!
//! Configuration comes from the environment (see `trumall_storefront::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trumall_storefront::Storefront;
use trumall_storefront::config::StorefrontConfig;
use trumall_storefront::error::AppError;

mod commands;

use commands::address::AddressAction;
use commands::cart::CartAction;
use commands::checkout::CheckoutArgs;
use commands::shipping::ShippingAction;

#[derive(Parser)]
#[command(name = "tm-cli")]
#[command(author, version, about = "Trumall storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// View and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage delivery addresses
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Shipping options and quotes
    Shipping {
        #[command(subcommand)]
        action: ShippingAction,
    },
    /// Pay for the cart
    Checkout(CheckoutArgs),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trumall_storefront=info,trumall_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, &config).await {
        e.report();
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), AppError> {
    let storefront = Storefront::connect(config)?;

    match cli.command {
        Commands::Cart { action } => commands::cart::run(&storefront, config, action).await,
        Commands::Address { action } => commands::address::run(&storefront, action).await,
        Commands::Shipping { action } => {
            commands::shipping::run(&storefront, config, action).await
        }
        Commands::Checkout(args) => commands::checkout::run(&storefront, config, args).await,
    }
}
