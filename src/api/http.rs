use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::identity::ViewerId;

use super::types::{FeedSnapshot, IndexingStatus, Repository, TopReposResponse};
use super::{ApiError, Endpoint, FeedApi, FeedRequest};

#[derive(Clone)]
pub struct HttpFeedApi {
    http: HttpClient,
    base_url: String,
}

impl HttpFeedApi {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(ApiError::from_reqwest)?;
        Ok(Self { http, base_url: cfg.base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, endpoint: Endpoint, viewer: Option<ViewerId>) -> String {
        match viewer {
            Some(v) => format!("{}/{}/{}", self.base_url, endpoint.as_str(), v),
            None => format!("{}/{}", self.base_url, endpoint.as_str()),
        }
    }

    async fn decode<T: DeserializeOwned>(endpoint: Endpoint, response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { endpoint, status });
        }
        let bytes = response.bytes().await.map_err(ApiError::from_reqwest)?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { endpoint, source })
    }
}

#[async_trait]
impl FeedApi for HttpFeedApi {
    async fn fetch_feed(&self, req: FeedRequest) -> Result<FeedSnapshot, ApiError> {
        let url = self.url(Endpoint::Feed, Some(req.viewer));
        debug!(%url, limit = req.limit, "GET feed");
        let response = self
            .http
            .get(url)
            .query(&[("limit", req.limit)])
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        let mut snapshot: FeedSnapshot = Self::decode(Endpoint::Feed, response).await?;
        let dropped = snapshot.dedup_ids();
        if dropped > 0 {
            warn!(viewer = %req.viewer, dropped, "feed contained duplicate event ids");
        }
        Ok(snapshot)
    }

    async fn init_feed(&self, viewer: ViewerId) -> Result<(), ApiError> {
        let url = self.url(Endpoint::Init, Some(viewer));
        debug!(%url, "POST init");
        let response = self.http.post(url).send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { endpoint: Endpoint::Init, status });
        }
        Ok(())
    }

    async fn fetch_status(&self, viewer: ViewerId) -> Result<IndexingStatus, ApiError> {
        let url = self.url(Endpoint::Status, Some(viewer));
        debug!(%url, "GET status");
        let response = self.http.get(url).send().await.map_err(ApiError::from_reqwest)?;
        Self::decode(Endpoint::Status, response).await
    }

    async fn top_repos(&self) -> Result<Vec<Repository>, ApiError> {
        let url = self.url(Endpoint::TopRepos, None);
        debug!(%url, "GET top-repos");
        let response = self.http.get(url).send().await.map_err(ApiError::from_reqwest)?;
        let body: TopReposResponse = Self::decode(Endpoint::TopRepos, response).await?;
        Ok(body.repositories)
    }
}
