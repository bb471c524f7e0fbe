// src/fetch/http.rs
//! reqwest plumbing shared by every backend source.

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::fetch::types::{ItemSource, WarmUp};

/// Turn a response into `T`, mapping non-2xx and undecodable bodies.
pub async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, FetchError> {
    let status = resp.status();
    let url = resp.url().to_string();
    if !status.is_success() {
        return Err(FetchError::status(status.as_u16(), url));
    }
    let body = resp.text().await.map_err(FetchError::from)?;
    serde_json::from_str(&body).map_err(FetchError::from)
}

/// GET `url` and decode the body as JSON.
pub async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, FetchError> {
    let resp = client.get(url).send().await.map_err(FetchError::from)?;
    read_json(resp).await
}

/// Any GET endpoint returning a JSON array. Item shape is opaque to the controller.
pub struct JsonCollection<T> {
    client: Client,
    url: String,
    name: &'static str,
    _item: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T> {
    pub fn new(client: Client, url: impl Into<String>, name: &'static str) -> Self {
        Self {
            client,
            url: url.into(),
            name,
            _item: PhantomData,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl<T> ItemSource for JsonCollection<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Item = T;

    async fn fetch(&self) -> Result<Vec<T>, FetchError> {
        get_json(&self.client, &self.url).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Unauthenticated health ping; response and failures are ignored.
pub struct HealthWarmUp {
    client: Client,
    url: String,
}

impl HealthWarmUp {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

/// GET the health endpoint. `Some(status)` when the backend answered at all.
pub async fn ping_health(client: &Client, url: &str) -> Option<u16> {
    match client.get(url).send().await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            tracing::debug!(target: "fetch", url = %url, status, "health ping");
            Some(status)
        }
        Err(e) => {
            tracing::debug!(target: "fetch", url = %url, error = %e, "health ping failed");
            None
        }
    }
}

#[async_trait]
impl WarmUp for HealthWarmUp {
    async fn ping(&self) {
        ping_health(&self.client, &self.url).await;
    }
}
