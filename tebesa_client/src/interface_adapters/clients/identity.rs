use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::domain::entities::Identity;
use crate::domain::errors::IdentityError;
use crate::domain::ports::IdentityProvider;
use crate::interface_adapters::clients::{HttpClientError, endpoint};
use crate::interface_adapters::protocol::{IdentityResponse, TokenExchangeRequest};

// Thin reqwest client for the identity service.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    http: Client,
    pub base_url: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn post_identity<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Identity, HttpClientError> {
        let url = endpoint(&self.base_url, path)?;
        let res = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(HttpClientError::Transport)?;

        if !res.status().is_success() {
            return Err(HttpClientError::from_response(res).await);
        }

        let payload = res
            .json::<IdentityResponse>()
            .await
            .map_err(HttpClientError::Decode)?;
        Ok(Identity::new(payload.user_id))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange_token(&self, token: &str) -> Result<Identity, IdentityError> {
        let body = TokenExchangeRequest {
            token: token.to_string(),
        };
        Ok(self.post_identity("/identity/token", &body).await?)
    }

    async fn issue_anonymous(&self) -> Result<Identity, IdentityError> {
        Ok(self
            .post_identity("/identity/anonymous", &serde_json::json!({}))
            .await?)
    }
}
