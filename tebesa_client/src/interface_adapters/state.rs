use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::entities::SessionState;
use crate::domain::ports::{Clock, DocumentStore, IdentityProvider};
use crate::use_cases::{MessageChannel, ProfileAccessor, SessionHandle, SessionManager};

// System clock adapter used by the message channel.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

// Backend capabilities the client consumes, held as trait objects.
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
}

/// Everything one client session needs, wired around a single session handle.
///
/// Profile and chat operations fail with `SessionNotReady` until
/// [`AppContext::initialize`] has finished.
pub struct AppContext {
    pub session: SessionManager<Arc<dyn IdentityProvider>>,
    pub profiles: ProfileAccessor<Arc<dyn DocumentStore>>,
    pub chat: MessageChannel<Arc<dyn DocumentStore>, Arc<dyn Clock>>,
}

impl AppContext {
    pub fn new(backend: Backend, app_id: impl Into<String>, bootstrap_token: Option<String>) -> Self {
        let app_id = app_id.into();
        let session = SessionManager::new(backend.identity, bootstrap_token);
        let profiles = ProfileAccessor {
            store: Arc::clone(&backend.store),
            app_id: app_id.clone(),
            session: session.handle(),
        };
        let chat = MessageChannel::new(backend.store, backend.clock, app_id, session.handle());

        Self {
            session,
            profiles,
            chat,
        }
    }

    pub async fn initialize(&self) -> SessionState {
        self.session.initialize().await
    }

    pub fn handle(&self) -> SessionHandle {
        self.session.handle()
    }
}
