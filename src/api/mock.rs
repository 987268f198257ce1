use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::identity::ViewerId;

use super::types::{FeedSnapshot, IndexingStatus, IndexingStats, Repository};
use super::{ApiError, Endpoint, FeedApi, FeedRequest};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiCall {
    Feed(ViewerId),
    Init(ViewerId),
    Status(ViewerId),
    TopRepos,
}

struct Scripted<T> {
    delay: Duration,
    result: Result<T, ApiError>,
}

/// Scripted in-memory service. Responses are popped in order per endpoint;
/// an empty init queue answers `Ok(())`.
#[derive(Default)]
pub struct MockFeedApi {
    feeds: Mutex<VecDeque<Scripted<FeedSnapshot>>>,
    inits: Mutex<VecDeque<Scripted<()>>>,
    statuses: Mutex<VecDeque<Scripted<IndexingStatus>>>,
    repos: Mutex<VecDeque<Scripted<Vec<Repository>>>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl MockFeedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_feed(&self, result: Result<FeedSnapshot, ApiError>) {
        self.push_feed_delayed(Duration::ZERO, result);
    }

    pub fn push_feed_delayed(&self, delay: Duration, result: Result<FeedSnapshot, ApiError>) {
        self.feeds.lock().unwrap().push_back(Scripted { delay, result });
    }

    pub fn push_init(&self, result: Result<(), ApiError>) {
        self.inits.lock().unwrap().push_back(Scripted { delay: Duration::ZERO, result });
    }

    pub fn push_status(&self, result: Result<IndexingStatus, ApiError>) {
        self.statuses.lock().unwrap().push_back(Scripted { delay: Duration::ZERO, result });
    }

    pub fn push_status_count(&self, events: u64) {
        self.push_status(Ok(IndexingStatus { stats: IndexingStats { events } }));
    }

    pub fn push_status_delayed(&self, delay: Duration, events: u64) {
        let result = Ok(IndexingStatus { stats: IndexingStats { events } });
        self.statuses.lock().unwrap().push_back(Scripted { delay, result });
    }

    pub fn push_repos(&self, result: Result<Vec<Repository>, ApiError>) {
        self.repos.lock().unwrap().push_back(Scripted { delay: Duration::ZERO, result });
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn answer<T>(queue: &Mutex<VecDeque<Scripted<T>>>, endpoint: Endpoint) -> Result<T, ApiError> {
        let next = queue.lock().unwrap().pop_front();
        match next {
            Some(Scripted { delay, result }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Err(ApiError::MockQueueEmpty(endpoint)),
        }
    }
}

#[async_trait]
impl FeedApi for MockFeedApi {
    async fn fetch_feed(&self, req: FeedRequest) -> Result<FeedSnapshot, ApiError> {
        self.record(ApiCall::Feed(req.viewer));
        Self::answer(&self.feeds, Endpoint::Feed).await
    }

    async fn init_feed(&self, viewer: ViewerId) -> Result<(), ApiError> {
        self.record(ApiCall::Init(viewer));
        match Self::answer(&self.inits, Endpoint::Init).await {
            Err(ApiError::MockQueueEmpty(_)) => Ok(()),
            other => other,
        }
    }

    async fn fetch_status(&self, viewer: ViewerId) -> Result<IndexingStatus, ApiError> {
        self.record(ApiCall::Status(viewer));
        Self::answer(&self.statuses, Endpoint::Status).await
    }

    async fn top_repos(&self) -> Result<Vec<Repository>, ApiError> {
        self.record(ApiCall::TopRepos);
        Self::answer(&self.repos, Endpoint::TopRepos).await
    }
}
