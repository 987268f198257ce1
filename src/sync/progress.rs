use std::time::Duration;

use tokio::time::Instant;

/// Time source for progress phrasing. Tests swap in a manual clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub const PHRASES: [&str; 3] = ["Reading commits", "Following branches", "Merging pull requests"];
pub const PHRASE_PERIOD: Duration = Duration::from_millis(2000);

/// Rotating status phrase. Advances one phrase per elapsed period, however
/// often it is asked.
#[derive(Clone, Debug)]
pub struct ProgressTicker {
    idx: usize,
    last: Instant,
    period: Duration,
}

impl ProgressTicker {
    pub fn new(start: Instant, period: Duration) -> Self {
        Self { idx: 0, last: start, period }
    }

    pub fn phrase_at(&mut self, now: Instant) -> &'static str {
        if !self.period.is_zero() {
            let elapsed = now.saturating_duration_since(self.last);
            let steps = (elapsed.as_millis() / self.period.as_millis().max(1)) as usize;
            if steps > 0 {
                self.idx = (self.idx + steps) % PHRASES.len();
                self.last += self.period * steps as u32;
            }
        }
        PHRASES[self.idx]
    }
}

pub fn progress_message(phrase: &str, current: u64, target: u64) -> String {
    format!("{phrase}… {current}/{target} events indexed")
}
