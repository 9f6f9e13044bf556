use std::sync::Arc;

use log::*;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::UpstreamError;

/// A thin wrapper over a shared `reqwest` client. Every upstream client sends its requests through here so that
/// status handling and error mapping are the same everywhere.
#[derive(Clone)]
pub struct RestClient {
    client: Arc<Client>,
}

impl RestClient {
    pub fn new() -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(concat!("smm-storefront/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Initialization(e.to_string()))?;
        Ok(Self { client: Arc::new(client) })
    }

    /// URLs are not logged here because bot transport URLs embed the token.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    pub async fn send(&self, req: RequestBuilder) -> Result<Response, UpstreamError> {
        let response = req.send().await.map_err(|e| UpstreamError::RestResponseError(e.without_url().to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| UpstreamError::RestResponseError(e.to_string()))?;
            Err(UpstreamError::QueryError { status, message })
        }
    }

    pub async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, UpstreamError> {
        let response = self.send(req).await?;
        response.json::<T>().await.map_err(|e| UpstreamError::JsonError(e.without_url().to_string()))
    }

    pub async fn text(&self, req: RequestBuilder) -> Result<String, UpstreamError> {
        let response = self.send(req).await?;
        response.text().await.map_err(|e| UpstreamError::RestResponseError(e.to_string()))
    }
}
