use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::api::{ApiError, ApiResult, LobstersApi, StoryJson, StoryWithCommentsJson};

pub struct HttpClient {
    base_url: Url,
    client: Client,
}

impl HttpClient {
    pub fn new(base_url: Url) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("tidepool/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self { base_url, client }
    }

    async fn get_json(&self, path: &str) -> ApiResult<Option<Vec<u8>>> {
        let url = self.base_url.join(path)?;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        Ok(Some(body.to_vec()))
    }
}

#[async_trait]
impl LobstersApi for HttpClient {
    async fn front_page(&self, page: u32) -> ApiResult<Vec<StoryJson>> {
        // Past the last page the server 404s; treat that as exhaustion.
        match self.get_json(&format!("page/{page}.json")).await? {
            Some(body) => Ok(serde_json::from_slice(&body)?),
            None => Ok(Vec::new()),
        }
    }

    async fn story(&self, short_id: &str) -> ApiResult<Option<StoryWithCommentsJson>> {
        match self.get_json(&format!("s/{short_id}.json")).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }
}
