use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::PollState;

/// State shared between a `Subscription` handle and its polling task.
pub(crate) struct Shared {
    pub(crate) in_flight: AtomicBool,
    pub(crate) attempts: AtomicU32,
    state: watch::Sender<PollState>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self { in_flight: AtomicBool::new(false), attempts: AtomicU32::new(0), state }
    }

    pub(crate) fn state(&self) -> PollState { *self.state.borrow() }

    /// Move to `next` unless already terminal. Terminal states are final.
    pub(crate) fn transition(&self, next: PollState) -> bool {
        self.state.send_if_modified(|cur| {
            if cur.is_terminal() || *cur == next {
                false
            } else {
                *cur = next;
                true
            }
        })
    }

    fn subscribe(&self) -> watch::Receiver<PollState> { self.state.subscribe() }
}

/// Handle to one polling cycle. Dropping it cancels the cycle.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    id: Uuid,
    label: String,
    interval: Duration,
    token: CancellationToken,
    shared: Arc<Shared>,
}

impl Subscription {
    pub(crate) fn new(label: String, interval: Duration, token: CancellationToken, shared: Arc<Shared>) -> Self {
        Self { id: Uuid::new_v4(), label, interval, token, shared }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn label(&self) -> &str { &self.label }
    pub fn interval(&self) -> Duration { self.interval }
    pub fn state(&self) -> PollState { self.shared.state() }
    pub fn is_in_flight(&self) -> bool { self.shared.in_flight.load(Ordering::SeqCst) }
    pub fn attempts(&self) -> u32 { self.shared.attempts.load(Ordering::SeqCst) }
    pub fn is_cancelled(&self) -> bool { self.token.is_cancelled() }

    /// Stop polling. A pending tick never fires and a response still in flight is
    /// discarded when it lands. No effect once the subscription is terminal.
    pub fn cancel(&self) {
        if self.shared.transition(PollState::Cancelled) {
            tracing::debug!(target: "careerscope::poll", "subscription cancelled id={} label={}", self.id, self.label);
        }
        self.token.cancel();
    }

    /// Wait until the subscription reaches a terminal state and return it.
    pub async fn finished(&self) -> PollState {
        let mut rx = self.shared.subscribe();
        let st = match rx.wait_for(|s| s.is_terminal()).await {
            Ok(s) => *s,
            Err(_) => self.shared.state(),
        };
        st
    }
}

impl Drop for Subscription {
    fn drop(&mut self) { self.cancel(); }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &self.state())
            .field("attempts", &self.attempts())
            .finish()
    }
}
