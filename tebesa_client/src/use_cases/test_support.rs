use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::{Document, Identity};
use crate::domain::errors::{IdentityError, StoreError};
use crate::domain::ports::{Clock, DocumentStore, IdentityProvider, SnapshotStream};
use crate::interface_adapters::memory::InMemoryDocumentStore;
use crate::use_cases::session::{SessionHandle, SessionManager};

// Adjustable time source so timestamp assertions are deterministic.
#[derive(Clone)]
pub(crate) struct FixedClock(Arc<AtomicU64>);

impl FixedClock {
    pub(crate) fn at(millis: u64) -> Self {
        Self(Arc::new(AtomicU64::new(millis)))
    }

    pub(crate) fn set(&self, millis: u64) {
        self.0.store(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_epoch_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// Scripted answers for each identity-provider step.
#[derive(Clone, Default)]
pub(crate) struct IdentityScript {
    pub current_user_id: Option<String>,
    pub current_fails: bool,
    pub exchange_user_id: Option<String>,
    pub exchange_fails: bool,
    pub anonymous_fails: bool,
    // Held before anonymous issuance answers.
    pub anonymous_delay: Option<Duration>,
}

#[derive(Clone)]
pub(crate) struct ScriptedIdentity {
    script: IdentityScript,
    // Step names in call order, for asserting the fallback chain.
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedIdentity {
    pub(crate) fn new(script: IdentityScript) -> Self {
        Self {
            script,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn record(&self, step: &'static str) {
        self.calls.lock().expect("calls mutex poisoned").push(step);
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn current_identity(&self) -> Result<Option<Identity>, IdentityError> {
        self.record("current");
        if self.script.current_fails {
            return Err(IdentityError::Unavailable("current failed".to_string()));
        }
        Ok(self.script.current_user_id.clone().map(Identity::new))
    }

    async fn exchange_token(&self, _token: &str) -> Result<Identity, IdentityError> {
        self.record("exchange");
        if self.script.exchange_fails {
            return Err(IdentityError::Rejected("exchange failed".to_string()));
        }
        let user_id = self
            .script
            .exchange_user_id
            .clone()
            .unwrap_or_else(|| "token-user".to_string());
        Ok(Identity::new(user_id))
    }

    async fn issue_anonymous(&self) -> Result<Identity, IdentityError> {
        self.record("anonymous");
        if let Some(delay) = self.script.anonymous_delay {
            tokio::time::sleep(delay).await;
        }
        if self.script.anonymous_fails {
            return Err(IdentityError::Unavailable("anonymous failed".to_string()));
        }
        Ok(Identity::new("anon-1"))
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub get: bool,
    pub set: bool,
    pub add: bool,
    pub subscribe: bool,
}

// In-memory store with per-operation failure switches.
#[derive(Clone)]
pub(crate) struct FlakyStore {
    pub inner: InMemoryDocumentStore,
    failures: FailureFlags,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryDocumentStore::new(),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }
}

fn unavailable(op: &str) -> StoreError {
    StoreError::Unavailable(format!("{op} failed"))
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        if self.failures.get {
            return Err(unavailable("get"));
        }
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        if self.failures.set {
            return Err(unavailable("set"));
        }
        self.inner.set(collection, id, data).await
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        if self.failures.add {
            return Err(unavailable("add"));
        }
        self.inner.add(collection, data).await
    }

    async fn subscribe(&self, collection: &str) -> Result<SnapshotStream, StoreError> {
        if self.failures.subscribe {
            return Err(unavailable("subscribe"));
        }
        self.inner.subscribe(collection).await
    }
}

// Session handle for `user_id` that has already passed identity resolution.
pub(crate) async fn ready_session(user_id: &str) -> (SessionManager<ScriptedIdentity>, SessionHandle) {
    let manager = SessionManager::new(
        ScriptedIdentity::new(IdentityScript {
            current_user_id: Some(user_id.to_string()),
            ..Default::default()
        }),
        None,
    );
    manager.initialize().await;
    let handle = manager.handle();
    (manager, handle)
}

// Session handle that never becomes ready.
pub(crate) fn pending_session() -> (SessionManager<ScriptedIdentity>, SessionHandle) {
    let manager = SessionManager::new(ScriptedIdentity::new(IdentityScript::default()), None);
    let handle = manager.handle();
    (manager, handle)
}
