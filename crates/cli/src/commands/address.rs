//! `tm-cli address ...`

use clap::{Args, Subcommand};
use trumall_core::{AddressId, AddressInput};
use trumall_storefront::Storefront;
use trumall_storefront::error::AppError;

use super::print_addresses;

#[derive(Subcommand)]
pub enum AddressAction {
    /// List saved addresses (`*` marks the default)
    List,
    /// Save a new address
    Add(AddressFields),
    /// Replace an address
    Update {
        id: String,

        #[command(flatten)]
        fields: AddressFields,
    },
    /// Delete an address
    Delete { id: String },
    /// Make an address the default
    Default { id: String },
}

#[derive(Args)]
pub struct AddressFields {
    /// Short name, e.g. "Home"
    #[arg(long, default_value = "")]
    label: String,

    #[arg(long)]
    street: String,

    #[arg(long)]
    city: String,

    #[arg(long, default_value = "")]
    state: String,

    #[arg(long, default_value = "Kenya")]
    country: String,

    #[arg(long, default_value = "")]
    postal_code: String,

    /// Make this the default address
    #[arg(long)]
    default: bool,
}

impl From<AddressFields> for AddressInput {
    fn from(fields: AddressFields) -> Self {
        Self {
            label: fields.label,
            street: fields.street,
            city: fields.city,
            state: fields.state,
            country: fields.country,
            postal_code: fields.postal_code,
            is_default: fields.default,
        }
    }
}

pub async fn run(storefront: &Storefront, action: AddressAction) -> Result<(), AppError> {
    match action {
        AddressAction::List => {}
        AddressAction::Add(fields) => {
            storefront.addresses.create(&fields.into()).await?;
        }
        AddressAction::Update { id, fields } => {
            storefront
                .addresses
                .update(&AddressId::new(id), &fields.into())
                .await?;
        }
        AddressAction::Delete { id } => {
            storefront.addresses.delete(&AddressId::new(id)).await?;
        }
        AddressAction::Default { id } => {
            storefront.addresses.set_default(&AddressId::new(id)).await?;
        }
    }

    // Listings depend on the address book
    storefront.shipping.invalidate();
    print_addresses(&storefront.addresses.list().await?);
    Ok(())
}
