//!
//! careerscope job status poller
//! -----------------------------
//! A cancellable state machine that repeatedly queries a remote resource until it
//! reports a terminal status:
//!
//! `Idle -> Polling -> {Succeeded, Cancelled, Errored}`
//!
//! Each subscription is one spawned task. The first fetch happens immediately and
//! later ones follow a fixed-cadence interval whose missed ticks are skipped, never
//! queued. Because the task awaits each fetch before taking the next tick, a
//! subscription has at most one request in flight at any instant.
//!
//! Cancellation is cooperative. The token is raced against the wait for the next
//! tick and checked again before a response is delivered. An in-flight fetch is
//! never aborted; its result is dropped on arrival.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ClientError;

mod probe;
mod subscription;

pub use probe::{channel_observer, probe_fn, FnProbe, PollEvent, PollObserver, StatusProbe};
pub use subscription::Subscription;
use subscription::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    #[default]
    Idle,
    Polling,
    Succeeded,
    Cancelled,
    Errored,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Succeeded | PollState::Cancelled | PollState::Errored)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollOptions {
    pub interval: Duration,
    /// Give up with `PollLimitExceeded` after this many non-terminal fetches.
    pub max_attempts: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self { Self { interval: Duration::from_secs(3), max_attempts: Some(200) } }
}

impl PollOptions {
    pub fn new(interval: Duration) -> Self { Self { interval, ..Default::default() } }

    pub fn with_max_attempts(mut self, max: Option<u32>) -> Self { self.max_attempts = max; self }
}

#[derive(Debug, Clone, Default)]
pub struct JobStatusPoller {
    options: PollOptions,
}

impl JobStatusPoller {
    pub fn new(options: PollOptions) -> Self { Self { options } }

    pub fn options(&self) -> &PollOptions { &self.options }

    /// Start polling `probe`, reporting to `observer`. Must be called from within a
    /// tokio runtime. The returned handle owns the cycle: dropping it cancels.
    pub fn start<P, O>(&self, label: impl Into<String>, probe: P, observer: O) -> Subscription
    where
        P: StatusProbe,
        O: PollObserver<P::Snapshot>,
    {
        let label = label.into();
        // tokio intervals reject a zero period
        let interval = self.options.interval.max(Duration::from_millis(1));
        let token = CancellationToken::new();
        let shared = Arc::new(Shared::new());
        let sub = Subscription::new(label.clone(), interval, token.clone(), shared.clone());
        debug!(target: "careerscope::poll", "subscription start id={} label={} interval_ms={}", sub.id(), label, interval.as_millis());
        let opts = PollOptions { interval, max_attempts: self.options.max_attempts };
        tokio::spawn(run(label, probe, observer, opts, token, shared));
        sub
    }

    pub fn cancel(&self, subscription: &Subscription) { subscription.cancel(); }
}

async fn run<P, O>(label: String, probe: P, mut observer: O, opts: PollOptions, token: CancellationToken, shared: Arc<Shared>)
where
    P: StatusProbe,
    O: PollObserver<P::Snapshot>,
{
    if !shared.transition(PollState::Polling) {
        return;
    }
    let mut ticker = tokio::time::interval(opts.interval);
    let mut last_progress: Option<u32> = None;
    let mut attempts: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        shared.in_flight.store(true, Ordering::SeqCst);
        let result = probe.fetch_status().await;
        shared.in_flight.store(false, Ordering::SeqCst);
        // ticks that elapsed during the fetch are dropped; next one is a full period out
        ticker.reset();
        attempts += 1;
        shared.attempts.store(attempts, Ordering::SeqCst);

        if token.is_cancelled() {
            debug!(target: "careerscope::poll", "discarding response after cancel label={}", label);
            break;
        }

        match result {
            Ok(snapshot) => {
                let terminal = probe.is_terminal(&snapshot);
                let rank = probe.progress(&snapshot);
                match last_progress {
                    Some(prev) if rank < prev && !terminal => {
                        debug!(target: "careerscope::poll", "suppressing stale snapshot label={} rank={} last={}", label, rank, prev);
                    }
                    _ => {
                        last_progress = Some(last_progress.map_or(rank, |p| p.max(rank)));
                        observer.on_update(snapshot);
                    }
                }
                if terminal {
                    shared.transition(PollState::Succeeded);
                    info!(target: "careerscope::poll", "reached terminal status label={} attempts={}", label, attempts);
                    return;
                }
            }
            Err(e) => {
                info!(target: "careerscope::poll", "status fetch failed label={} attempts={}: {}", label, attempts, e);
                observer.on_error(e);
                shared.transition(PollState::Errored);
                return;
            }
        }

        if let Some(max) = opts.max_attempts {
            if attempts >= max {
                info!(target: "careerscope::poll", "giving up label={} attempts={}", label, attempts);
                observer.on_error(ClientError::poll_limit(attempts));
                shared.transition(PollState::Errored);
                return;
            }
        }
    }

    shared.transition(PollState::Cancelled);
    debug!(target: "careerscope::poll", "subscription stopped label={} attempts={}", label, attempts);
}
