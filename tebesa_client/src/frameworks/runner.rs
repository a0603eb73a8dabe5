// Framework bootstrap for the demo client session.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::domain::entities::{ConversationKey, OutgoingMessage, Profile};
use crate::domain::errors::ClientError;
use crate::frameworks::config::{self, BackendConfig, ClientConfig, ConfigError};
use crate::interface_adapters::{
    AppContext, Backend, HttpDocumentStore, HttpIdentityProvider, InMemoryDocumentStore,
    LocalIdentityProvider, SystemClock,
};
use crate::use_cases::SendOutcome;

const GREETING: &str = "Selam! Nice to match with you.";
const BATCH_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("no message batch arrived within {0:?}")]
    NoBatch(Duration),
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn build_backend(config: &ClientConfig) -> Result<Backend, RunError> {
    let clock = Arc::new(SystemClock);
    let backend = match &config.backend {
        BackendConfig::InMemory => {
            tracing::debug!("using the in-memory backend");
            Backend {
                identity: Arc::new(LocalIdentityProvider::new()),
                store: Arc::new(InMemoryDocumentStore::new()),
                clock,
            }
        }
        BackendConfig::Http {
            identity_url,
            store_url,
        } => {
            tracing::debug!(%identity_url, %store_url, "using the http backend");
            let timeout = config.request_timeout();
            Backend {
                identity: Arc::new(HttpIdentityProvider::new(identity_url.clone(), timeout)?),
                store: Arc::new(HttpDocumentStore::new(store_url.clone(), timeout)?),
                clock,
            }
        }
    };
    Ok(backend)
}

pub async fn run() -> Result<(), RunError> {
    // Loading reads `.env` first, so a RUST_LOG set there reaches the filter.
    let config = ClientConfig::load();
    init_tracing();
    let config = config.inspect_err(|e| tracing::error!(error = %e, "invalid configuration"))?;
    tracing::info!(app_id = %config.app_id, "starting client session");

    let backend = build_backend(&config)
        .inspect_err(|e| tracing::error!(error = %e, "failed to build backend"))?;
    let context = AppContext::new(backend, config.app_id.clone(), config.bootstrap_token.clone());
    run_demo(&context, config::DEMO_MATCH_ID)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "demo session failed"))
}

// One pass through the prototype flow: sign in, load the profile, chat once.
pub async fn run_demo(context: &AppContext, match_id: &str) -> Result<(), RunError> {
    let state = context.initialize().await;
    let user_id = context.handle().require_ready()?;
    tracing::info!(%user_id, authenticated = state.authenticated, "identity resolved");

    let profile = context
        .profiles
        .fetch_or_create(&user_id, Profile::placeholder(&user_id))
        .await?;
    tracing::info!(
        name = %profile.name,
        age = profile.age,
        interests = profile.interests.len(),
        photos = profile.photos.len(),
        "profile loaded"
    );

    let key = ConversationKey::between(&user_id, match_id);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = context
        .chat
        .subscribe(&key, move |batch| {
            let _ = tx.send(batch);
        })
        .await?;

    let sent = context
        .chat
        .send(&key, OutgoingMessage::new(GREETING, match_id))
        .await?;
    let SendOutcome::Sent(sent) = sent else {
        subscription.detach();
        return Ok(());
    };

    let delivered = timeout(BATCH_WAIT, async {
        while let Some(batch) = rx.recv().await {
            if batch.iter().any(|message| message.id == sent.id) {
                return Some(batch);
            }
        }
        None
    })
    .await
    .ok()
    .flatten();
    subscription.detach();

    let batch = delivered.ok_or(RunError::NoBatch(BATCH_WAIT))?;
    for message in &batch {
        tracing::info!(
            from = %message.sender_id,
            to = %message.receiver_id,
            timestamp = message.timestamp,
            text = %message.text,
            "chat message"
        );
    }
    Ok(())
}
