use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{ClientError, ClientResult};

/// A status-bearing remote resource the poller can query.
#[async_trait]
pub trait StatusProbe: Send + Sync + 'static {
    type Snapshot: Send + 'static;

    async fn fetch_status(&self) -> ClientResult<Self::Snapshot>;

    fn is_terminal(&self, snapshot: &Self::Snapshot) -> bool;

    /// Monotonic progress rank. Snapshots ranking below one already delivered are
    /// stale reads and are suppressed. The default ranks everything equally.
    fn progress(&self, _snapshot: &Self::Snapshot) -> u32 { 0 }
}

/// Closure-backed probe, see [`probe_fn`].
pub struct FnProbe<S, F, T> {
    fetch: F,
    is_terminal: T,
    _snapshot: PhantomData<fn() -> S>,
}

/// Build a probe from a fetch closure and a terminal predicate.
pub fn probe_fn<S, F, Fut, T>(fetch: F, is_terminal: T) -> FnProbe<S, F, T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ClientResult<S>> + Send + 'static,
    T: Fn(&S) -> bool + Send + Sync + 'static,
    S: Send + 'static,
{
    FnProbe { fetch, is_terminal, _snapshot: PhantomData }
}

#[async_trait]
impl<S, F, Fut, T> StatusProbe for FnProbe<S, F, T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ClientResult<S>> + Send + 'static,
    T: Fn(&S) -> bool + Send + Sync + 'static,
    S: Send + 'static,
{
    type Snapshot = S;

    async fn fetch_status(&self) -> ClientResult<S> { (self.fetch)().await }

    fn is_terminal(&self, snapshot: &S) -> bool { (self.is_terminal)(snapshot) }
}

/// What a subscription reports to its consumer.
#[derive(Debug)]
pub enum PollEvent<S> {
    Update(S),
    Error(ClientError),
}

/// Receives snapshots (`on_update`) and the error that stopped polling (`on_error`).
pub trait PollObserver<S>: Send + 'static {
    fn on_update(&mut self, snapshot: S);
    fn on_error(&mut self, error: ClientError);
}

impl<S, F> PollObserver<S> for F
where
    F: FnMut(PollEvent<S>) + Send + 'static,
{
    fn on_update(&mut self, snapshot: S) { self(PollEvent::Update(snapshot)) }
    fn on_error(&mut self, error: ClientError) { self(PollEvent::Error(error)) }
}

/// Observer that forwards events into a channel, for consumers that prefer a stream.
pub fn channel_observer<S: Send + 'static>() -> (impl PollObserver<S>, mpsc::UnboundedReceiver<PollEvent<S>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let observer = move |ev: PollEvent<S>| {
        // receiver gone means nobody is watching any more; the poll still winds down normally
        let _ = tx.send(ev);
    };
    (observer, rx)
}
