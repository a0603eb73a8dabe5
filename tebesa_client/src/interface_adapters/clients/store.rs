use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};
use url::Url;

use crate::domain::entities::{CollectionSnapshot, Document};
use crate::domain::errors::StoreError;
use crate::domain::ports::{DocumentStore, SnapshotStream};
use crate::interface_adapters::clients::{HttpClientError, endpoint};
use crate::interface_adapters::protocol::{AddDocumentResponse, DocumentResponse};

/// reqwest client for the document service.
///
/// Reads and writes go over plain HTTP; subscriptions open a WebSocket on the same
/// host that pushes one JSON snapshot per change.
#[derive(Clone)]
pub struct HttpDocumentStore {
    http: Client,
    pub base_url: String,
}

impl HttpDocumentStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn documents_url(&self, collection: &str, id: Option<&str>) -> Result<Url, HttpClientError> {
        let mut url = endpoint(&self.base_url, "/documents")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("collection", collection);
            if let Some(id) = id {
                query.append_pair("id", id);
            }
        }
        Ok(url)
    }

    fn subscribe_url(&self, collection: &str) -> Result<Url, HttpClientError> {
        let mut url = endpoint(&self.base_url, "/documents/subscribe")?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(HttpClientError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|()| HttpClientError::UnsupportedScheme(url.scheme().to_string()))?;
        url.query_pairs_mut().append_pair("collection", collection);
        Ok(url)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let url = self.documents_url(collection, Some(id))?;
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(HttpClientError::Transport)?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(HttpClientError::from_response(res).await.into());
        }

        let payload = res
            .json::<DocumentResponse>()
            .await
            .map_err(HttpClientError::Decode)?;
        Ok(Some(payload.data))
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        let url = self.documents_url(collection, Some(id))?;
        let res = self
            .http
            .put(url)
            .json(&data)
            .send()
            .await
            .map_err(HttpClientError::Transport)?;

        if !res.status().is_success() {
            return Err(HttpClientError::from_response(res).await.into());
        }
        Ok(())
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        let url = self.documents_url(collection, None)?;
        let res = self
            .http
            .post(url)
            .json(&data)
            .send()
            .await
            .map_err(HttpClientError::Transport)?;

        if !res.status().is_success() {
            return Err(HttpClientError::from_response(res).await.into());
        }

        let payload = res
            .json::<AddDocumentResponse>()
            .await
            .map_err(HttpClientError::Decode)?;
        Ok(payload.id)
    }

    async fn subscribe(&self, collection: &str) -> Result<SnapshotStream, StoreError> {
        let url = self.subscribe_url(collection)?;
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        debug!(%url, "snapshot socket connected");

        // Frames other than text carry no snapshot; close and transport errors end the stream.
        let stream = socket
            .take_while(|frame| {
                let open = !matches!(frame, Ok(WsMessage::Close(_)));
                async move { open }
            })
            .filter_map(|frame| async move {
                match frame {
                    Ok(WsMessage::Text(text)) => Some(
                        serde_json::from_str::<CollectionSnapshot>(&text).map_err(StoreError::from),
                    ),
                    Ok(_) => None,
                    Err(err) => {
                        warn!(error = %err, "snapshot socket failed");
                        Some(Err(StoreError::Closed))
                    }
                }
            })
            .scan(false, |failed, item| {
                // Stop after yielding the first socket failure.
                let done = *failed;
                *failed = matches!(item, Err(StoreError::Closed));
                async move { if done { None } else { Some(item) } }
            });
        Ok(stream.boxed())
    }
}
