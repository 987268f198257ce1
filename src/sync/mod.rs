//! Feed synchronization: fetch the viewer's feed, and when the backend has
//! nothing yet, kick off indexing, poll until enough events exist and fetch
//! once more.
//!
//! Every run owns a sequence token and a cancellation token. Starting a new
//! run (identity change) or tearing down cancels the previous one, and a
//! state update is only committed while its token is still the latest.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::api::types::FeedSnapshot;
use crate::api::{ApiError, FeedApi, FeedRequest};
use crate::config::PollConfig;
use crate::identity::{ResolvedIdentity, ViewerId};
use crate::telemetry::{self};
use crate::telemetry::ops::feed::Phase as FeedPhase;

pub mod poller;
pub mod progress;

use poller::{PollOutcome, PollProgress, StatusPoller};
use progress::{Clock, TokioClock};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Loading { viewer: ViewerId },
    Initializing { viewer: ViewerId, progress: Option<PollProgress> },
    Ready {
        viewer: ViewerId,
        snapshot: FeedSnapshot,
        /// set when the snapshot came out of a cold start
        #[serde(skip_serializing_if = "Option::is_none")]
        cold_start: Option<PollOutcome>,
    },
    Error { viewer: ViewerId, message: String },
}

impl SyncState {
    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Loading { .. } => "loading",
            SyncState::Initializing { .. } => "initializing",
            SyncState::Ready { .. } => "ready",
            SyncState::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Ready { .. } | SyncState::Error { .. })
    }
}

#[derive(Debug)]
pub enum SyncError {
    FetchFailed(ApiError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::FetchFailed(err) => write!(f, "Failed to fetch feed: {err}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::FetchFailed(err) => Some(err),
        }
    }
}

struct CycleGuard {
    seq: u64,
    cancel: CancellationToken,
}

#[derive(Clone)]
struct Cycle {
    token: u64,
    cancel: CancellationToken,
}

pub struct FeedSync {
    api: Arc<dyn FeedApi>,
    feed_limit: u32,
    poll: PollConfig,
    clock: Arc<dyn Clock>,
    state: watch::Sender<SyncState>,
    guard: Mutex<CycleGuard>,
}

impl FeedSync {
    pub fn new(api: Arc<dyn FeedApi>, feed_limit: u32, poll: PollConfig) -> Self {
        Self::with_clock(api, feed_limit, poll, Arc::new(TokioClock))
    }

    pub fn with_clock(api: Arc<dyn FeedApi>, feed_limit: u32, poll: PollConfig, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            api,
            feed_limit,
            poll,
            clock,
            state,
            guard: Mutex::new(CycleGuard { seq: 0, cancel: CancellationToken::new() }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Invalidates the running cycle. Nothing it does afterwards reaches the
    /// published state.
    pub fn teardown(&self) {
        let mut g = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        g.cancel.cancel();
        g.seq += 1;
    }

    /// Runs one full cycle for `identity`, superseding any running one.
    /// Returns the terminal state, or `None` when this cycle was superseded
    /// or torn down before it finished.
    pub async fn run(&self, identity: &ResolvedIdentity) -> Option<SyncState> {
        let cycle = self.begin();
        let log = telemetry::feed();
        let span = log.root_span_kv([("viewer", identity.viewer.to_string()), ("cycle", cycle.token.to_string())]);
        self.run_cycle(cycle, identity.viewer).instrument(span).await
    }

    fn begin(&self) -> Cycle {
        let mut g = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        g.cancel.cancel();
        g.seq += 1;
        g.cancel = CancellationToken::new();
        Cycle { token: g.seq, cancel: g.cancel.clone() }
    }

    fn commit(&self, cycle: &Cycle, next: SyncState) -> bool {
        let g = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        if g.seq != cycle.token || cycle.cancel.is_cancelled() {
            tracing::debug!(cycle = cycle.token, latest = g.seq, state = next.name(), "stale update dropped");
            return false;
        }
        self.state.send_replace(next);
        true
    }

    fn finish(&self, cycle: &Cycle, state: SyncState) -> Option<SyncState> {
        if self.commit(cycle, state.clone()) { Some(state) } else { None }
    }

    async fn run_cycle(&self, cycle: Cycle, viewer: ViewerId) -> Option<SyncState> {
        let log = telemetry::feed();
        if !self.commit(&cycle, SyncState::Loading { viewer }) {
            return None;
        }

        let req = FeedRequest { viewer, limit: self.feed_limit };
        let first = guarded(&cycle, self.api.fetch_feed(req).instrument(log.span(&FeedPhase::Fetch))).await?;
        let snapshot = match first {
            Ok(s) => s,
            Err(err) => return self.fail(&cycle, viewer, err),
        };
        if !snapshot.is_empty() {
            log.info_kv("feed ready", [
                ("events", snapshot.events.len().to_string()),
                ("from_cache", snapshot.from_cache.to_string()),
            ]);
            return self.finish(&cycle, SyncState::Ready { viewer, snapshot, cold_start: None });
        }

        log.info_kv("feed empty; indexing viewer", [("viewer", viewer.to_string())]);
        if !self.commit(&cycle, SyncState::Initializing { viewer, progress: None }) {
            return None;
        }

        // Best effort: awaited only to keep init ahead of the first status
        // request. Failure is logged and never retried.
        let init = guarded(&cycle, self.api.init_feed(viewer).instrument(log.span(&FeedPhase::Init))).await?;
        if let Err(err) = init {
            log.warn_kv("init request failed; polling anyway", [("error", err.to_string())]);
        }

        let poller = StatusPoller::new(self.api.as_ref(), self.poll, self.clock.as_ref());
        let outcome = poller
            .run(viewer, &cycle.cancel, |p| {
                self.commit(&cycle, SyncState::Initializing { viewer, progress: Some(p.clone()) });
            })
            .instrument(log.span(&FeedPhase::Poll))
            .await;
        if let PollOutcome::Cancelled { .. } = outcome {
            return None;
        }

        let refetch = guarded(&cycle, self.api.fetch_feed(req).instrument(log.span(&FeedPhase::Refetch))).await?;
        match refetch {
            Ok(snapshot) => {
                log.info_kv("cold start finished", [
                    ("events", snapshot.events.len().to_string()),
                    ("poll", format!("{outcome:?}")),
                ]);
                self.finish(&cycle, SyncState::Ready { viewer, snapshot, cold_start: Some(outcome) })
            }
            Err(err) => self.fail(&cycle, viewer, err),
        }
    }

    fn fail(&self, cycle: &Cycle, viewer: ViewerId, err: ApiError) -> Option<SyncState> {
        let message = SyncError::FetchFailed(err).to_string();
        telemetry::feed().error(&message);
        self.finish(cycle, SyncState::Error { viewer, message })
    }
}

/// Abandons `fut` as soon as the cycle is cancelled.
async fn guarded<T>(cycle: &Cycle, fut: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = cycle.cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{ApiCall, MockFeedApi};
    use crate::api::types::{Actor, Event, EventRepo};
    use crate::api::Endpoint;
    use crate::identity::tests::StubHost;
    use crate::identity::{IdentityResolver, IdentitySource};
    use chrono::Utc;
    use reqwest::StatusCode;
    use std::time::Duration;

    const T: u64 = 10;
    const N: u32 = 5;

    fn poll_cfg() -> PollConfig {
        PollConfig { threshold: T, max_attempts: N, interval: Duration::from_millis(2000) }
    }

    fn ident(id: u64) -> ResolvedIdentity {
        ResolvedIdentity { viewer: ViewerId(id), source: IdentitySource::Host, advisory: None }
    }

    fn snapshot(ids: &[&str]) -> FeedSnapshot {
        let events = ids
            .iter()
            .map(|id| Event {
                id: id.to_string(),
                event_type: "PushEvent".into(),
                created_at: Utc::now(),
                actor: Actor { login: "octo".into(), avatar_url: String::new() },
                repo: EventRepo { name: "octo/hello".into(), url: String::new() },
                fid: None,
                action: "pushed".into(),
                commit_message: None,
                farcaster: None,
                event_url: String::new(),
            })
            .collect();
        FeedSnapshot { events, from_cache: false, cache_age: 0.0 }
    }

    fn machine(api: &Arc<MockFeedApi>) -> Arc<FeedSync> {
        Arc::new(FeedSync::new(api.clone(), 100, poll_cfg()))
    }

    fn http_err(endpoint: Endpoint) -> ApiError {
        ApiError::Status { endpoint, status: StatusCode::INTERNAL_SERVER_ERROR }
    }

    #[tokio::test(start_paused = true)]
    async fn non_empty_feed_is_ready_after_one_request() {
        let api = Arc::new(MockFeedApi::new());
        api.push_feed(Ok(snapshot(&["a", "b"])));
        let sync = machine(&api);
        assert_eq!(sync.state(), SyncState::Idle);

        let out = sync.run(&ident(1)).await.unwrap();
        match out {
            SyncState::Ready { snapshot, cold_start, .. } => {
                assert_eq!(snapshot.events.len(), 2);
                assert!(cold_start.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(api.calls(), vec![ApiCall::Feed(ViewerId(1))]);
        assert_eq!(sync.state().name(), "ready");
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_is_terminal_error() {
        let api = Arc::new(MockFeedApi::new());
        api.push_feed(Err(http_err(Endpoint::Feed)));
        let sync = machine(&api);

        let out = sync.run(&ident(1)).await.unwrap();
        match out {
            SyncState::Error { message, .. } => assert!(message.starts_with("Failed to fetch feed")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cold_start_inits_once_polls_then_refetches_once() {
        let api = Arc::new(MockFeedApi::new());
        api.push_feed(Ok(snapshot(&[])));
        for n in [2, 5, 12] { api.push_status_count(n); }
        api.push_feed(Ok(snapshot(&["x"])));
        let sync = machine(&api);

        let out = sync.run(&ident(9)).await.unwrap();
        let v = ViewerId(9);
        assert_eq!(
            api.calls(),
            vec![
                ApiCall::Feed(v),
                ApiCall::Init(v),
                ApiCall::Status(v),
                ApiCall::Status(v),
                ApiCall::Status(v),
                ApiCall::Feed(v),
            ]
        );
        match out {
            SyncState::Ready { snapshot, cold_start, .. } => {
                assert_eq!(snapshot.events.len(), 1);
                assert_eq!(cold_start, Some(PollOutcome::ThresholdMet { events: 12, attempts: 3 }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_poll_still_ends_ready_even_if_empty() {
        let api = Arc::new(MockFeedApi::new());
        api.push_feed(Ok(snapshot(&[])));
        for _ in 0..N { api.push_status_count(1); }
        api.push_feed(Ok(snapshot(&[])));
        let sync = machine(&api);

        let out = sync.run(&ident(3)).await.unwrap();
        match out {
            SyncState::Ready { snapshot, cold_start, .. } => {
                assert!(snapshot.is_empty());
                assert_eq!(cold_start, Some(PollOutcome::Exhausted { events: 1, attempts: N }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(api.count(|c| matches!(c, ApiCall::Init(_))), 1);
        assert_eq!(api.count(|c| matches!(c, ApiCall::Status(_))), N as usize);
        assert_eq!(api.count(|c| matches!(c, ApiCall::Feed(_))), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn init_failure_is_swallowed() {
        let api = Arc::new(MockFeedApi::new());
        api.push_feed(Ok(snapshot(&[])));
        api.push_init(Err(http_err(Endpoint::Init)));
        api.push_status_count(T);
        api.push_feed(Ok(snapshot(&["a"])));
        let sync = machine(&api);

        let out = sync.run(&ident(3)).await.unwrap();
        assert_eq!(out.name(), "ready");
        assert_eq!(api.count(|c| matches!(c, ApiCall::Status(_))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refetch_is_an_error() {
        let api = Arc::new(MockFeedApi::new());
        api.push_feed(Ok(snapshot(&[])));
        api.push_status_count(T);
        api.push_feed(Err(http_err(Endpoint::Feed)));
        let sync = machine(&api);

        let out = sync.run(&ident(3)).await.unwrap();
        assert_eq!(out.name(), "error");
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_published_while_initializing() {
        let api = Arc::new(MockFeedApi::new());
        api.push_feed(Ok(snapshot(&[])));
        api.push_status_count(4);
        api.push_status_count(T);
        api.push_feed(Ok(snapshot(&["a"])));
        let sync = machine(&api);
        let mut rx = sync.subscribe();

        let task = tokio::spawn({
            let sync = sync.clone();
            async move { sync.run(&ident(5)).await }
        });

        let mut seen = Vec::new();
        loop {
            rx.changed().await.unwrap();
            let state = rx.borrow_and_update().clone();
            if let SyncState::Initializing { progress: Some(p), .. } = &state {
                seen.push(p.current);
            }
            if state.is_terminal() { break; }
        }
        assert!(task.await.unwrap().is_some());
        // the first reading sits in the state for a whole interval
        assert!(seen.contains(&4));
        assert!(seen.iter().all(|c| *c == 4 || *c == T));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_identity_wins_over_stale_response() {
        let api = Arc::new(MockFeedApi::new());
        api.push_feed_delayed(Duration::from_secs(5), Ok(snapshot(&["stale"])));
        api.push_feed(Ok(snapshot(&["fresh"])));
        let sync = machine(&api);

        let first = tokio::spawn({
            let sync = sync.clone();
            async move { sync.run(&ident(1)).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;

        let second = sync.run(&ident(2)).await.unwrap();
        assert_eq!(second.name(), "ready");
        assert!(first.await.unwrap().is_none());

        tokio::time::sleep(Duration::from_secs(10)).await;
        match sync.state() {
            SyncState::Ready { viewer, snapshot, .. } => {
                assert_eq!(viewer, ViewerId(2));
                assert_eq!(snapshot.events[0].id, "fresh");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_mid_poll_freezes_state() {
        let api = Arc::new(MockFeedApi::new());
        api.push_feed(Ok(snapshot(&[])));
        for _ in 0..N { api.push_status_delayed(Duration::from_millis(500), 1); }
        api.push_feed(Ok(snapshot(&["late"])));
        let sync = machine(&api);
        let mut rx = sync.subscribe();

        let task = tokio::spawn({
            let sync = sync.clone();
            async move { sync.run(&ident(4)).await }
        });
        // first reading lands at 2.5s; teardown while the second sleep runs
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(sync.state().name(), "initializing");
        sync.teardown();
        rx.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(task.await.unwrap().is_none());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(sync.state().name(), "initializing");
        assert_eq!(api.count(|c| matches!(c, ApiCall::Feed(_))), 1);
        assert_eq!(api.count(|c| matches!(c, ApiCall::Status(_))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn new_identity_during_status_request_silences_the_old_cycle() {
        let api = Arc::new(MockFeedApi::new());
        api.push_feed(Ok(snapshot(&[])));
        api.push_status_delayed(Duration::from_millis(1000), T);
        api.push_feed(Err(http_err(Endpoint::Feed)));
        let sync = machine(&api);
        let mut rx = sync.subscribe();

        let first = tokio::spawn({
            let sync = sync.clone();
            async move { sync.run(&ident(1)).await }
        });
        // viewer 1's status request went out at 2s and answers at 3s
        tokio::time::sleep(Duration::from_millis(2200)).await;
        assert_eq!(api.count(|c| matches!(c, ApiCall::Status(_))), 1);

        let second = sync.run(&ident(2)).await.unwrap();
        assert_eq!(second.name(), "error");
        rx.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(first.await.unwrap().is_none());
        assert!(!rx.has_changed().unwrap());
        match sync.state() {
            SyncState::Error { viewer, .. } => assert_eq!(viewer, ViewerId(2)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(api.count(|c| matches!(c, ApiCall::Status(_))), 1);
        assert_eq!(api.count(|c| matches!(c, ApiCall::Feed(_))), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn identity_failure_still_reaches_a_terminal_state() {
        let host = StubHost::failing();
        let resolver = IdentityResolver::new(ViewerId(6023));
        let api = Arc::new(MockFeedApi::new());
        api.push_feed(Ok(snapshot(&["a"])));
        let sync = machine(&api);

        let identity = resolver.resolve(&host).await;
        assert!(identity.advisory.is_some());
        let out = sync.run(identity).await.unwrap();
        assert!(out.is_terminal());
        assert_eq!(api.calls(), vec![ApiCall::Feed(ViewerId(6023))]);
    }
}
