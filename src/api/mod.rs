//! Client for the feed service: feed snapshots, cold-start indexing and the
//! top repository list.

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::identity::ViewerId;

mod http;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use http::HttpFeedApi;
use types::{FeedSnapshot, IndexingStatus, Repository};

/// Parameters of one feed GET.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedRequest {
    pub viewer: ViewerId,
    pub limit: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Feed,
    Init,
    Status,
    TopRepos,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Feed => "feed",
            Endpoint::Init => "init",
            Endpoint::Status => "status",
            Endpoint::TopRepos => "top-repos",
        }
    }
}

#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn fetch_feed(&self, req: FeedRequest) -> Result<FeedSnapshot, ApiError>;

    /// Asks the backend to start indexing the viewer. The body is ignored.
    async fn init_feed(&self, viewer: ViewerId) -> Result<(), ApiError>;

    async fn fetch_status(&self, viewer: ViewerId) -> Result<IndexingStatus, ApiError>;

    async fn top_repos(&self) -> Result<Vec<Repository>, ApiError>;
}

#[derive(Debug)]
pub enum ApiError {
    Http(reqwest::Error),
    Timeout,
    Status { endpoint: Endpoint, status: StatusCode },
    Decode { endpoint: Endpoint, source: serde_json::Error },
    #[cfg(test)]
    MockQueueEmpty(Endpoint),
}

impl ApiError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Http(err)
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http(err) => write!(f, "http error: {err}"),
            ApiError::Timeout => write!(f, "request timed out"),
            ApiError::Status { endpoint, status } => {
                write!(f, "{} returned {status}", endpoint.as_str())
            }
            ApiError::Decode { endpoint, source } => {
                write!(f, "could not decode {} response: {source}", endpoint.as_str())
            }
            #[cfg(test)]
            ApiError::MockQueueEmpty(endpoint) => {
                write!(f, "mock {} response queue is empty", endpoint.as_str())
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Http(err) => Some(err),
            ApiError::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}
