use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use shopdeck_types::ReadinessOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Polling,
    Ready,
    TimedOut,
}

/// Bounded readiness probe: evaluates the predicate immediately, then once
/// per interval until it holds or the attempts run out. Suspends between
/// evaluations; never blocks other work. The poller only reports the
/// measurement; latency policy belongs to the caller.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPoller {
    interval: Duration,
    max_attempts: u32,
}

impl ReadinessPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn run<F>(&self, mut predicate: F) -> ReadinessOutcome
    where
        F: FnMut() -> bool,
    {
        let started = Instant::now();
        let mut attempts = 0u32;
        let mut state = PollState::Polling;

        while state == PollState::Polling {
            attempts += 1;
            if predicate() {
                state = PollState::Ready;
            } else if attempts >= self.max_attempts {
                state = PollState::TimedOut;
            } else {
                tokio::time::sleep(self.interval).await;
            }
        }

        let outcome = ReadinessOutcome {
            ready: state == PollState::Ready,
            elapsed_ms: started.elapsed().as_millis() as u64,
            attempts,
        };
        debug!(
            ready = outcome.ready,
            attempts = outcome.attempts,
            elapsed_ms = outcome.elapsed_ms,
            "readiness poll finished"
        );
        outcome
    }
}
