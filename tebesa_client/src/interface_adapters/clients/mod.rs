pub mod identity;
pub mod store;

pub use identity::HttpIdentityProvider;
pub use store::HttpDocumentStore;

use reqwest::{Response, StatusCode};
use thiserror::Error;
use url::Url;

use crate::domain::errors::{IdentityError, StoreError};
use crate::interface_adapters::protocol::ErrorResponse;

// Failure categories shared by the reqwest-backed clients.
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("upstream error {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Upstream {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("response decode error: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
}

impl HttpClientError {
    // Keep upstream status/message so callers can tell rejection from outage.
    pub(crate) async fn from_response(res: Response) -> Self {
        let status = res.status();
        let message = res
            .json::<ErrorResponse>()
            .await
            .ok()
            .map(|payload| payload.message);
        HttpClientError::Upstream { status, message }
    }
}

impl From<HttpClientError> for IdentityError {
    fn from(err: HttpClientError) -> Self {
        match &err {
            HttpClientError::Upstream { status, .. } if status.is_client_error() => {
                IdentityError::Rejected(err.to_string())
            }
            _ => IdentityError::Unavailable(err.to_string()),
        }
    }
}

impl From<HttpClientError> for StoreError {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::Upstream { status, message } => StoreError::Rejected {
                status: status.as_u16(),
                message: message.unwrap_or_default(),
            },
            HttpClientError::Decode(err) => StoreError::Decode(err.to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

// Appends `path` to `base`, keeping any path prefix the base already carries.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url, HttpClientError> {
    let base = base.trim_end_matches('/');
    Ok(Url::parse(&format!("{base}{path}"))?)
}
