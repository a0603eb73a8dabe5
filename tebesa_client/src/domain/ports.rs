use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use crate::domain::entities::{CollectionSnapshot, Document, Identity};
use crate::domain::errors::{IdentityError, StoreError};

// Repeated full-collection snapshots; ends when the subscription is torn down.
pub type SnapshotStream =
    Pin<Box<dyn Stream<Item = Result<CollectionSnapshot, StoreError>> + Send + 'static>>;

// Port for the identity provider consulted during session resolution.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    // Identity the provider already holds from an earlier sign-in, if any.
    async fn current_identity(&self) -> Result<Option<Identity>, IdentityError> {
        Ok(None)
    }

    async fn exchange_token(&self, token: &str) -> Result<Identity, IdentityError>;
    async fn issue_anonymous(&self) -> Result<Identity, IdentityError>;
}

// Port for the key-addressed document store behind profiles and chat.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;
    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError>;
    // Appends a document under a store-assigned id and returns that id.
    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError>;
    // The first item is the collection as it is now.
    async fn subscribe(&self, collection: &str) -> Result<SnapshotStream, StoreError>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> u64;
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    async fn current_identity(&self) -> Result<Option<Identity>, IdentityError> {
        (**self).current_identity().await
    }

    async fn exchange_token(&self, token: &str) -> Result<Identity, IdentityError> {
        (**self).exchange_token(token).await
    }

    async fn issue_anonymous(&self) -> Result<Identity, IdentityError> {
        (**self).issue_anonymous().await
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        (**self).set(collection, id, data).await
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        (**self).add(collection, data).await
    }

    async fn subscribe(&self, collection: &str) -> Result<SnapshotStream, StoreError> {
        (**self).subscribe(collection).await
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now_epoch_millis(&self) -> u64 {
        (**self).now_epoch_millis()
    }
}
