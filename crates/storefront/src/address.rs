//! Saved delivery addresses.

use std::sync::Arc;

use tracing::instrument;
use trumall_core::{Address, AddressId, AddressInput, default_selection};

use crate::api::{ApiError, CommerceApi};
use crate::notify::{Notification, Notifier};

const LOAD_FAILED: &str = "Failed to load addresses.";

/// CRUD over the buyer's address book.
pub struct AddressBook {
    api: Arc<dyn CommerceApi>,
    notifier: Arc<dyn Notifier>,
}

impl AddressBook {
    pub fn new(api: Arc<dyn CommerceApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// All saved addresses.
    ///
    /// # Errors
    ///
    /// Returns the API error after notifying the buyer.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Address>, ApiError> {
        self.api
            .list_addresses()
            .await
            .map_err(|e| self.fail(e, LOAD_FAILED))
    }

    /// The addresses together with the one checkout should preselect.
    ///
    /// # Errors
    ///
    /// Same as [`AddressBook::list`].
    pub async fn list_with_default(&self) -> Result<(Vec<Address>, Option<AddressId>), ApiError> {
        let addresses = self.list().await?;
        let selected = default_selection(&addresses).map(|a| a.id.clone());
        Ok((addresses, selected))
    }

    /// # Errors
    ///
    /// Returns the API error after notifying the buyer.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &AddressInput) -> Result<Address, ApiError> {
        let address = self
            .api
            .create_address(input)
            .await
            .map_err(|e| self.fail(e, "Failed to save address."))?;
        self.notifier.notify(Notification::success("Address saved"));
        Ok(address)
    }

    /// # Errors
    ///
    /// Returns the API error after notifying the buyer.
    #[instrument(skip(self, input), fields(address_id = %id))]
    pub async fn update(&self, id: &AddressId, input: &AddressInput) -> Result<Address, ApiError> {
        let address = self
            .api
            .update_address(id, input)
            .await
            .map_err(|e| self.fail(e, "Failed to update address."))?;
        self.notifier.notify(Notification::success("Address updated"));
        Ok(address)
    }

    /// # Errors
    ///
    /// Returns the API error after notifying the buyer.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn delete(&self, id: &AddressId) -> Result<(), ApiError> {
        self.api
            .delete_address(id)
            .await
            .map_err(|e| self.fail(e, "Failed to delete address."))?;
        self.notifier.notify(Notification::success("Address deleted"));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the API error after notifying the buyer.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn set_default(&self, id: &AddressId) -> Result<(), ApiError> {
        self.api
            .set_default_address(id)
            .await
            .map_err(|e| self.fail(e, "Failed to set default address."))?;
        self.notifier
            .notify(Notification::success("Default address updated"));
        Ok(())
    }

    fn fail(&self, error: ApiError, fallback: &str) -> ApiError {
        tracing::warn!(error = %error, "Address request failed");
        let message = error.server_message().unwrap_or(fallback).to_string();
        self.notifier.notify(Notification::error(message));
        error
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::notify::NotificationLevel;
    use crate::testing::{FakeApi, RecordingNotifier, address};

    fn book(api: &FakeApi) -> (AddressBook, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (AddressBook::new(Arc::new(api.clone()), notifier.clone()), notifier)
    }

    #[tokio::test]
    async fn test_default_address_is_preselected() {
        let api = FakeApi::new().with_addresses(vec![address("a1", false), address("a2", true)]);
        let (book, _) = book(&api);

        let (addresses, selected) = book.list_with_default().await.unwrap();

        assert_eq!(addresses.len(), 2);
        assert_eq!(selected, Some(AddressId::new("a2")));
    }

    #[tokio::test]
    async fn test_first_address_without_default() {
        let api = FakeApi::new().with_addresses(vec![address("a1", false), address("a2", false)]);
        let (book, _) = book(&api);

        let (_, selected) = book.list_with_default().await.unwrap();

        assert_eq!(selected, Some(AddressId::new("a1")));
    }

    #[tokio::test]
    async fn test_list_failure_notifies() {
        let api = FakeApi::new();
        api.fail_addresses();
        let (book, notifier) = book(&api);

        assert!(book.list().await.is_err());
        assert_eq!(notifier.messages(NotificationLevel::Error), vec![LOAD_FAILED]);
    }

    #[tokio::test]
    async fn test_create_then_set_default() {
        let api = FakeApi::new().with_addresses(vec![address("a1", true)]);
        let (book, _) = book(&api);

        let created = book
            .create(&AddressInput {
                street: "Kenyatta Ave".to_string(),
                city: "Mombasa".to_string(),
                ..AddressInput::default()
            })
            .await
            .unwrap();
        book.set_default(&created.id).await.unwrap();

        let (_, selected) = book.list_with_default().await.unwrap();
        assert_eq!(selected, Some(created.id));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let api = FakeApi::new().with_addresses(vec![address("a1", true)]);
        let (book, _) = book(&api);

        let updated = book
            .update(
                &AddressId::new("a1"),
                &AddressInput {
                    street: "Tom Mboya St".to_string(),
                    city: "Nairobi".to_string(),
                    ..AddressInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.street, "Tom Mboya St");

        book.delete(&AddressId::new("a1")).await.unwrap();
        assert!(book.list().await.unwrap().is_empty());
    }
}
