//! Saved delivery addresses.

use serde::{Deserialize, Serialize};

use super::id::AddressId;

/// A delivery address saved on the buyer's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    #[serde(default)]
    pub label: String,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    /// One-line summary, e.g. `Home: 12 Moi Ave, Nairobi, Kenya`.
    #[must_use]
    pub fn summary(&self) -> String {
        let place = [self.street.as_str(), self.city.as_str(), self.country.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if self.label.is_empty() {
            place
        } else {
            format!("{}: {place}", self.label)
        }
    }
}

/// Fields for creating or updating an address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressInput {
    pub label: String,
    pub street: String,
    pub city: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub country: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Pick the address checkout should start with: the one flagged default,
/// otherwise the first one.
#[must_use]
pub fn default_selection(addresses: &[Address]) -> Option<&Address> {
    addresses
        .iter()
        .find(|a| a.is_default)
        .or_else(|| addresses.first())
}
