use tokio::sync::{OnceCell, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::entities::{Identity, IdentitySource, SessionState};
use crate::domain::errors::{ClientError, IdentityError};
use crate::domain::ports::IdentityProvider;

// Read-only view of the session shared with downstream components.
#[derive(Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    // Gate for profile and message operations.
    pub fn require_ready(&self) -> Result<String, ClientError> {
        let state = self.rx.borrow();
        match (&state.user_id, state.ready) {
            (Some(user_id), true) => Ok(user_id.clone()),
            _ => Err(ClientError::SessionNotReady),
        }
    }

    // Resolves once identity resolution has finished.
    pub async fn wait_ready(&self) -> Result<SessionState, ClientError> {
        let mut rx = self.rx.clone();
        let state = rx
            .wait_for(|state| state.ready)
            .await
            .map_err(|_| ClientError::SessionNotReady)?;
        Ok(state.clone())
    }
}

/// Owns the identity state of one client session.
///
/// Resolution completes at most once: restored identity, then the bootstrap token, then
/// anonymous issuance, then a locally generated id. Whatever happens, the session
/// ends up ready.
pub struct SessionManager<I> {
    identity: I,
    bootstrap_token: Option<String>,
    state: watch::Sender<SessionState>,
    resolved: OnceCell<SessionState>,
}

impl<I> SessionManager<I>
where
    I: IdentityProvider,
{
    pub fn new(identity: I, bootstrap_token: Option<String>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            identity,
            // A blank token is the same as no token.
            bootstrap_token: bootstrap_token.filter(|token| !token.trim().is_empty()),
            state,
            resolved: OnceCell::new(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            rx: self.state.subscribe(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    // Concurrent callers share one resolution. If the caller running it is
    // cancelled, the next waiting or later caller starts it again.
    #[tracing::instrument(name = "session_initialize", skip_all)]
    pub async fn initialize(&self) -> SessionState {
        self.resolved
            .get_or_init(|| async {
                let resolved = self.resolve().await;
                info!(
                    user_id = resolved.user_id().unwrap_or_default(),
                    authenticated = resolved.authenticated,
                    source = ?resolved.source,
                    "session ready"
                );
                self.state.send_replace(resolved.clone());
                resolved
            })
            .await
            .clone()
    }

    async fn resolve(&self) -> SessionState {
        match self.identity.current_identity().await {
            Ok(Some(identity)) => {
                if let Ok(user_id) = non_empty(identity) {
                    return SessionState::authenticated(user_id, IdentitySource::Restored);
                }
                warn!("restored identity has an empty user id; ignoring it");
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "restored identity lookup failed"),
        }

        if let Some(token) = self.bootstrap_token.as_deref() {
            match self.identity.exchange_token(token).await.and_then(non_empty) {
                Ok(user_id) => {
                    return SessionState::authenticated(user_id, IdentitySource::BootstrapToken);
                }
                Err(err) => warn!(error = %err, "bootstrap token exchange failed"),
            }
        }

        match self.identity.issue_anonymous().await.and_then(non_empty) {
            Ok(user_id) => SessionState::authenticated(user_id, IdentitySource::Anonymous),
            Err(err) => {
                warn!(error = %err, "anonymous sign-in failed; using a local id");
                SessionState::degraded(Uuid::new_v4().to_string())
            }
        }
    }
}

// An empty uid moves on to the next step rather than minting an authenticated random id.
fn non_empty(identity: Identity) -> Result<String, IdentityError> {
    if identity.user_id.trim().is_empty() {
        return Err(IdentityError::EmptyUserId);
    }
    Ok(identity.user_id)
}
