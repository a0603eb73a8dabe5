// Stub backend that serves the in-memory store and identity provider over HTTP.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json, Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use futures::StreamExt;
use serde::Deserialize;
use tebesa_client::domain::{Document, DocumentStore, IdentityProvider};
use tebesa_client::interface_adapters::protocol::{
    AddDocumentResponse, DocumentResponse, ErrorResponse, IdentityResponse, TokenExchangeRequest,
};
use tebesa_client::interface_adapters::{InMemoryDocumentStore, LocalIdentityProvider};

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Clone)]
pub struct StubBackend {
    pub base_url: String,
    pub store: InMemoryDocumentStore,
    // Flip to make every document endpoint answer 503.
    pub store_down: Arc<AtomicBool>,
}

impl StubBackend {
    pub fn take_store_down(&self) {
        self.store_down.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone)]
struct StubState {
    store: InMemoryDocumentStore,
    identity: LocalIdentityProvider,
    store_down: Arc<AtomicBool>,
}

#[derive(Debug, Deserialize)]
struct DocumentQuery {
    collection: String,
    #[serde(default)]
    id: Option<String>,
}

// Serve a fresh backend on an ephemeral port for the current test runtime.
pub async fn spawn_backend(identity: LocalIdentityProvider) -> StubBackend {
    let store = InMemoryDocumentStore::new();
    let store_down = Arc::new(AtomicBool::new(false));
    let state = StubState {
        store: store.clone(),
        identity,
        store_down: Arc::clone(&store_down),
    };

    let app = Router::new()
        .route("/identity/token", post(exchange_token))
        .route("/identity/anonymous", post(issue_anonymous))
        .route(
            "/documents",
            get(get_document).put(put_document).post(add_document),
        )
        .route("/documents/subscribe", get(subscribe))
        .with_state(state);

    // Bind to an ephemeral port to avoid collisions with local services.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub backend failed");
    });

    StubBackend {
        base_url: format!("http://{addr}"),
        store,
        store_down,
    }
}

fn error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            message: message.to_string(),
        }),
    )
}

fn check_store(state: &StubState) -> Result<(), ApiError> {
    if state.store_down.load(Ordering::SeqCst) {
        return Err(error(StatusCode::SERVICE_UNAVAILABLE, "store is down"));
    }
    Ok(())
}

async fn exchange_token(
    State(state): State<StubState>,
    Json(body): Json<TokenExchangeRequest>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let identity = state
        .identity
        .exchange_token(&body.token)
        .await
        .map_err(|_| error(StatusCode::UNAUTHORIZED, "invalid token"))?;
    Ok(Json(IdentityResponse {
        user_id: identity.user_id,
    }))
}

async fn issue_anonymous(
    State(state): State<StubState>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let identity = state
        .identity
        .issue_anonymous()
        .await
        .map_err(|_| error(StatusCode::BAD_GATEWAY, "identity error"))?;
    Ok(Json(IdentityResponse {
        user_id: identity.user_id,
    }))
}

async fn get_document(
    State(state): State<StubState>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<DocumentResponse>, ApiError> {
    check_store(&state)?;
    let id = query
        .id
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "id is required"))?;
    let data = state
        .store
        .get(&query.collection, &id)
        .await
        .map_err(|_| error(StatusCode::BAD_GATEWAY, "storage error"))?
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "document not found"))?;
    Ok(Json(DocumentResponse { id, data }))
}

async fn put_document(
    State(state): State<StubState>,
    Query(query): Query<DocumentQuery>,
    Json(data): Json<Document>,
) -> Result<StatusCode, ApiError> {
    check_store(&state)?;
    let id = query
        .id
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "id is required"))?;
    state
        .store
        .set(&query.collection, &id, data)
        .await
        .map_err(|_| error(StatusCode::BAD_GATEWAY, "storage error"))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_document(
    State(state): State<StubState>,
    Query(query): Query<DocumentQuery>,
    Json(data): Json<Document>,
) -> Result<Json<AddDocumentResponse>, ApiError> {
    check_store(&state)?;
    let id = state
        .store
        .add(&query.collection, data)
        .await
        .map_err(|_| error(StatusCode::BAD_GATEWAY, "storage error"))?;
    Ok(Json(AddDocumentResponse { id }))
}

async fn subscribe(
    State(state): State<StubState>,
    Query(query): Query<DocumentQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_snapshots(socket, state.store, query.collection))
}

// Push every snapshot of the collection until the client goes away.
async fn forward_snapshots(mut socket: WebSocket, store: InMemoryDocumentStore, collection: String) {
    let Ok(mut snapshots) = store.subscribe(&collection).await else {
        return;
    };
    while let Some(Ok(snapshot)) = snapshots.next().await {
        let Ok(text) = serde_json::to_string(&snapshot) else {
            break;
        };
        if socket.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
}
