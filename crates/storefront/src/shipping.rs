//! Shipping method discovery and quoting.
//!
//! Method listings are cached per (address, subtotal) for 5 minutes using
//! `moka`, since the backend prices them off both. When the listing cannot be
//! loaded the buyer still gets the built-in Standard and Express options.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};
use trumall_core::{AddressId, Cents, ShippingMethod, ShippingOption, ShippingQuote};

use crate::api::{ApiError, CommerceApi};
use crate::notify::{Notification, Notifier};

const CACHE_TTL: Duration = Duration::from_secs(300);

/// Lists and prices delivery options for an address.
#[derive(Clone)]
pub struct ShippingSelector {
    api: Arc<dyn CommerceApi>,
    notifier: Arc<dyn Notifier>,
    cache: Cache<(AddressId, Cents), Vec<ShippingOption>>,
}

impl ShippingSelector {
    pub fn new(api: Arc<dyn CommerceApi>, notifier: Arc<dyn Notifier>) -> Self {
        let cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            api,
            notifier,
            cache,
        }
    }

    /// Options available for `address_id`.
    ///
    /// Never fails: on an API error the fallback options are returned (and
    /// not cached) after notifying the buyer.
    #[instrument(skip(self), fields(address_id = %address_id, subtotal = %subtotal))]
    pub async fn methods_for(&self, address_id: &AddressId, subtotal: Cents) -> Vec<ShippingOption> {
        let key = (address_id.clone(), subtotal);
        if let Some(options) = self.cache.get(&key).await {
            debug!("Cache hit for shipping methods");
            return options;
        }

        match self.api.shipping_methods(address_id).await {
            Ok(options) if !options.is_empty() => {
                self.cache.insert(key, options.clone()).await;
                options
            }
            Ok(_) => {
                debug!("No shipping methods returned, using fallback");
                ShippingOption::fallback()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load shipping methods, using fallback");
                self.notifier
                    .notify(Notification::error("Failed to load shipping options"));
                ShippingOption::fallback()
            }
        }
    }

    /// Price shipping the cart to `address_id` with `method`.
    ///
    /// # Errors
    ///
    /// Returns the API error after notifying the buyer.
    #[instrument(skip(self), fields(address_id = %address_id, method = %method))]
    pub async fn quote(
        &self,
        address_id: &AddressId,
        method: ShippingMethod,
    ) -> Result<ShippingQuote, ApiError> {
        match self.api.calculate_shipping(address_id, method).await {
            Ok(quote) => {
                if quote.is_free_shipping {
                    self.notifier
                        .notify(Notification::success("Free shipping applied!"));
                }
                Ok(quote)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to calculate shipping");
                self.notifier
                    .notify(Notification::error("Failed to calculate shipping cost"));
                Err(e)
            }
        }
    }

    /// Drop every cached listing, e.g. after the address book changes.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

/// The option checkout should preselect: Standard when offered, otherwise
/// the first one.
#[must_use]
pub fn preferred(options: &[ShippingOption]) -> Option<&ShippingOption> {
    options
        .iter()
        .find(|o| o.method == ShippingMethod::Standard)
        .or_else(|| options.first())
}
