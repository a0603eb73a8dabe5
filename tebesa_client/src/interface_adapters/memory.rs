use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{Mutex, watch};

use crate::domain::entities::{CollectionSnapshot, Document, Identity, StoredDocument};
use crate::domain::errors::{IdentityError, StoreError};
use crate::domain::ports::{DocumentStore, IdentityProvider, SnapshotStream};

type Collections = Arc<Mutex<HashMap<String, watch::Sender<CollectionSnapshot>>>>;

/// Document store kept in process memory.
///
/// Each collection is a `watch` channel holding its latest snapshot, so subscribers
/// always see the full set. Changes landing between two polls of a subscriber
/// coalesce into one snapshot.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Collections,
    next_id: Arc<AtomicU64>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self, collection: &str) -> CollectionSnapshot {
        let collections = self.collections.lock().await;
        collections
            .get(collection)
            .map(|tx| tx.borrow().clone())
            .unwrap_or_default()
    }

    // Number of open subscriptions on a collection.
    pub async fn listener_count(&self, collection: &str) -> usize {
        let collections = self.collections.lock().await;
        collections
            .get(collection)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

fn new_collection() -> watch::Sender<CollectionSnapshot> {
    watch::channel(CollectionSnapshot::default()).0
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections.get(collection).and_then(|tx| {
            tx.borrow()
                .docs
                .iter()
                .find(|doc| doc.id == id)
                .map(|doc| doc.data.clone())
        }))
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        let tx = collections
            .entry(collection.to_string())
            .or_insert_with(new_collection);
        tx.send_modify(|snapshot| {
            match snapshot.docs.iter_mut().find(|doc| doc.id == id) {
                Some(doc) => doc.data = data,
                None => snapshot.docs.push(StoredDocument {
                    id: id.to_string(),
                    data,
                }),
            }
        });
        Ok(())
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut collections = self.collections.lock().await;
        let tx = collections
            .entry(collection.to_string())
            .or_insert_with(new_collection);
        tx.send_modify(|snapshot| {
            snapshot.docs.push(StoredDocument {
                id: id.clone(),
                data,
            })
        });
        Ok(id)
    }

    async fn subscribe(&self, collection: &str) -> Result<SnapshotStream, StoreError> {
        let rx = {
            let mut collections = self.collections.lock().await;
            collections
                .entry(collection.to_string())
                .or_insert_with(new_collection)
                .subscribe()
        };

        let stream = futures::stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first {
                // Sender lives as long as the store; an error means it was dropped.
                rx.changed().await.ok()?;
            }
            let snapshot = rx.borrow_and_update().clone();
            Some((Ok(snapshot), (rx, false)))
        });
        Ok(stream.boxed())
    }
}

/// Identity provider that issues ids locally.
///
/// Anonymous users get `anon-1`, `anon-2`, ...; tokens registered with
/// [`LocalIdentityProvider::with_token`] exchange for their user id. The last
/// identity handed out is remembered as the signed-in user.
#[derive(Clone, Default)]
pub struct LocalIdentityProvider {
    tokens: HashMap<String, String>,
    current: Arc<Mutex<Option<Identity>>>,
    next_anonymous: Arc<AtomicU64>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_id.into());
        self
    }

    pub async fn sign_out(&self) {
        self.current.lock().await.take();
    }

    async fn remember(&self, identity: Identity) -> Identity {
        *self.current.lock().await = Some(identity.clone());
        identity
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn current_identity(&self) -> Result<Option<Identity>, IdentityError> {
        Ok(self.current.lock().await.clone())
    }

    async fn exchange_token(&self, token: &str) -> Result<Identity, IdentityError> {
        let user_id = self
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| IdentityError::Rejected("unknown token".to_string()))?;
        Ok(self.remember(Identity::new(user_id)).await)
    }

    async fn issue_anonymous(&self) -> Result<Identity, IdentityError> {
        let n = self.next_anonymous.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(self.remember(Identity::new(format!("anon-{n}"))).await)
    }
}
