use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::entities::{
    CollectionSnapshot, ConversationKey, Document, Message, OutgoingMessage, sort_for_display,
};
use crate::domain::errors::{ClientError, StoreError, ValidationFailure};
use crate::domain::ports::{Clock, DocumentStore};
use crate::use_cases::session::SessionHandle;

// Sorted full-conversation batches; dropping the stream detaches it.
pub type MessageFeed = BoxStream<'static, Result<Vec<Message>, StoreError>>;

type BatchListener = Box<dyn FnMut(Vec<Message>) + Send>;
type ListenerSlot = Arc<Mutex<Option<BatchListener>>>;

// Result of a send attempt that reached the channel.
#[derive(Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(Message),
    // Nothing was written.
    Rejected(ValidationFailure),
}

/// Active message subscription.
///
/// Detaching, or dropping the handle, clears the listener under its lock and stops
/// the delivery task, so `on_batch` is never entered again once this returns. Do not
/// detach from inside `on_batch` itself.
pub struct Subscription {
    listener: ListenerSlot,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn detach(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        lock(&self.listener).is_some() && !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        lock(&self.listener).take();
        self.task.abort();
    }
}

// Chat messages for the conversations of one application id.
pub struct MessageChannel<S, C> {
    pub store: S,
    pub clock: C,
    pub app_id: String,
    pub session: SessionHandle,
    last_timestamp: AtomicU64,
}

impl<S, C> MessageChannel<S, C>
where
    S: DocumentStore,
    C: Clock,
{
    pub fn new(store: S, clock: C, app_id: impl Into<String>, session: SessionHandle) -> Self {
        Self {
            store,
            clock,
            app_id: app_id.into(),
            session,
            last_timestamp: AtomicU64::new(0),
        }
    }

    pub fn collection(&self, key: &ConversationKey) -> String {
        format!("artifacts/{}/public/data/chats/{}/messages", self.app_id, key)
    }

    #[tracing::instrument(name = "chat_send", skip_all, fields(conversation = %key))]
    pub async fn send(
        &self,
        key: &ConversationKey,
        outgoing: OutgoingMessage,
    ) -> Result<SendOutcome, ClientError> {
        let sender_id = self.session.require_ready()?;
        if outgoing.text.trim().is_empty() {
            debug!("ignoring blank message");
            return Ok(SendOutcome::Rejected(ValidationFailure::EmptyText));
        }

        let mut message = Message {
            id: String::new(),
            text: outgoing.text,
            sender_id,
            receiver_id: outgoing.receiver_id,
            timestamp: self.next_timestamp(),
        };
        let document = match serde_json::to_value(&message).map_err(StoreError::from)? {
            Value::Object(document) => document,
            _ => {
                return Err(StoreError::Decode("message did not encode to an object".into()).into());
            }
        };

        message.id = self.store.add(&self.collection(key), document).await?;
        info!(message_id = %message.id, timestamp = message.timestamp, "message sent");
        Ok(SendOutcome::Sent(message))
    }

    // Stream of sorted batches, starting with the conversation as it is now.
    pub async fn feed(&self, key: &ConversationKey) -> Result<MessageFeed, ClientError> {
        self.session.require_ready()?;
        let snapshots = self.store.subscribe(&self.collection(key)).await?;
        Ok(snapshots
            .map(|snapshot| snapshot.map(into_batch))
            .boxed())
    }

    // Calls `on_batch` with the full sorted conversation on every change.
    #[tracing::instrument(name = "chat_subscribe", skip_all, fields(conversation = %key))]
    pub async fn subscribe<F>(
        &self,
        key: &ConversationKey,
        on_batch: F,
    ) -> Result<Subscription, ClientError>
    where
        F: FnMut(Vec<Message>) + Send + 'static,
    {
        let mut feed = self.feed(key).await?;
        let listener: ListenerSlot = Arc::new(Mutex::new(Some(Box::new(on_batch))));
        let task_listener = Arc::clone(&listener);
        let conversation = key.to_string();

        let task = tokio::spawn(async move {
            while let Some(item) = feed.next().await {
                match item {
                    Ok(batch) => {
                        if !deliver(&task_listener, batch) {
                            break;
                        }
                    }
                    Err(err) => {
                        error!(%conversation, error = %err, "message subscription error");
                    }
                }
            }
            debug!(%conversation, "message subscription finished");
        });

        Ok(Subscription { listener, task })
    }

    // Strictly increasing per channel even if the clock stalls or steps back.
    fn next_timestamp(&self) -> u64 {
        let now = self.clock.now_epoch_millis();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

fn lock(listener: &ListenerSlot) -> MutexGuard<'_, Option<BatchListener>> {
    listener.lock().unwrap_or_else(PoisonError::into_inner)
}

// Returns false once the listener has been detached.
fn deliver(listener: &ListenerSlot, batch: Vec<Message>) -> bool {
    let mut guard = lock(listener);
    match guard.as_mut() {
        Some(on_batch) => {
            on_batch(batch);
            true
        }
        None => false,
    }
}

fn into_batch(snapshot: CollectionSnapshot) -> Vec<Message> {
    let mut batch: Vec<Message> = snapshot
        .docs
        .into_iter()
        .filter_map(|doc| match decode_message(doc.data) {
            Ok(message) => Some(Message { id: doc.id, ..message }),
            Err(err) => {
                warn!(doc_id = %doc.id, error = %err, "skipping undecodable message");
                None
            }
        })
        .collect();
    sort_for_display(&mut batch);
    batch
}

fn decode_message(document: Document) -> Result<Message, serde_json::Error> {
    serde_json::from_value(Value::Object(document))
}
