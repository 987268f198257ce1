use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::api::FeedApi;
use crate::config::PollConfig;
use crate::identity::ViewerId;
use crate::telemetry::{self};

use super::progress::{progress_message, Clock, ProgressTicker, PHRASE_PERIOD};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PollProgress {
    pub attempt: u32,
    pub max_attempts: u32,
    pub current: u64,
    pub target: u64,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    ThresholdMet { events: u64, attempts: u32 },
    /// attempt cap reached; a normal ending, not an error
    Exhausted { events: u64, attempts: u32 },
    Cancelled { attempts: u32 },
}

/// Fixed-interval status polling with a hard attempt cap.
///
/// A failed status request still counts as an attempt. It is logged and read
/// as "no new information": the last known count is kept and polling goes on.
pub struct StatusPoller<'a> {
    api: &'a dyn FeedApi,
    cfg: PollConfig,
    clock: &'a dyn Clock,
}

impl<'a> StatusPoller<'a> {
    pub fn new(api: &'a dyn FeedApi, cfg: PollConfig, clock: &'a dyn Clock) -> Self {
        Self { api, cfg, clock }
    }

    /// `on_progress` is only called while `liveness` is not cancelled.
    pub async fn run<F>(&self, viewer: ViewerId, liveness: &CancellationToken, mut on_progress: F) -> PollOutcome
    where
        F: FnMut(&PollProgress) + Send,
    {
        let log = telemetry::feed();
        let mut ticker = ProgressTicker::new(self.clock.now(), PHRASE_PERIOD);
        let mut attempts = 0u32;
        let mut current = 0u64;

        if self.cfg.max_attempts == 0 {
            return PollOutcome::Exhausted { events: current, attempts };
        }

        loop {
            tokio::select! {
                biased;
                _ = liveness.cancelled() => return PollOutcome::Cancelled { attempts },
                _ = tokio::time::sleep(self.cfg.interval) => {}
            }

            let reading = tokio::select! {
                biased;
                _ = liveness.cancelled() => return PollOutcome::Cancelled { attempts },
                r = self.api.fetch_status(viewer) => r,
            };
            if liveness.is_cancelled() {
                return PollOutcome::Cancelled { attempts };
            }
            attempts += 1;

            match reading {
                Ok(status) => current = status.stats.events,
                Err(err) => log.warn_kv("status check failed; keeping last count", [
                    ("attempt", attempts.to_string()),
                    ("error", err.to_string()),
                ]),
            }

            let progress = PollProgress {
                attempt: attempts,
                max_attempts: self.cfg.max_attempts,
                current,
                target: self.cfg.threshold,
                message: progress_message(ticker.phrase_at(self.clock.now()), current, self.cfg.threshold),
            };
            log.debug_kv("poll", [("attempt", attempts.to_string()), ("events", current.to_string())]);
            on_progress(&progress);

            if current >= self.cfg.threshold {
                return PollOutcome::ThresholdMet { events: current, attempts };
            }
            if attempts >= self.cfg.max_attempts {
                log.info_kv("poll attempts exhausted", [("events", current.to_string())]);
                return PollOutcome::Exhausted { events: current, attempts };
            }
        }
    }
}
