use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ClientResult;

use super::credentials::{Credential, CredentialStore};
use super::principal::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Client-held authentication state. Only constructed through the three
/// constructors below, so `Authenticated` always carries both a credential and
/// an identity and the other states carry neither.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    credential: Option<Credential>,
    identity: Option<Identity>,
    status: SessionStatus,
}

impl Session {
    pub fn anonymous() -> Self { Self { credential: None, identity: None, status: SessionStatus::Anonymous } }

    pub fn authenticating() -> Self { Self { credential: None, identity: None, status: SessionStatus::Authenticating } }

    pub fn authenticated(credential: Credential, identity: Identity) -> Self {
        Self { credential: Some(credential), identity: Some(identity), status: SessionStatus::Authenticated }
    }

    pub fn credential(&self) -> Option<&Credential> { self.credential.as_ref() }
    pub fn identity(&self) -> Option<&Identity> { self.identity.as_ref() }
    pub fn status(&self) -> SessionStatus { self.status }
    pub fn is_authenticated(&self) -> bool { self.status == SessionStatus::Authenticated }
}

impl Default for Session {
    fn default() -> Self { Self::anonymous() }
}

/// Resolves the identity behind a candidate credential (`GET /users/me`).
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_identity(&self, credential: &Credential) -> ClientResult<Identity>;
}

struct State {
    /// Bumped on every replacement; lets a resolution that suspended detect it was superseded.
    epoch: u64,
    session: Session,
}

struct StoreInner {
    state: RwLock<State>,
    persisted: Arc<dyn CredentialStore>,
    notify: watch::Sender<Session>,
}

/// Process-wide session holder. Clones share the same state.
///
/// Every write replaces the whole `Session` value; the lock is never held across
/// an `.await`, so readers see either the old or the new session, never a mix.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    pub fn new(persisted: Arc<dyn CredentialStore>) -> Self {
        let (notify, _) = watch::channel(Session::anonymous());
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(State { epoch: 0, session: Session::anonymous() }),
                persisted,
                notify,
            }),
        }
    }

    /// Synchronous read of the in-memory session. Never performs I/O.
    pub fn current(&self) -> Session { self.inner.state.read().session.clone() }

    /// Observe every session replacement.
    pub fn subscribe(&self) -> watch::Receiver<Session> { self.inner.notify.subscribe() }

    fn replace(&self, state: &mut State, session: Session) -> u64 {
        state.epoch += 1;
        state.session = session.clone();
        self.inner.notify.send_replace(session);
        state.epoch
    }

    /// Publish `Authenticating` and return the epoch a later commit must match.
    pub(crate) fn begin(&self) -> u64 {
        let mut st = self.inner.state.write();
        self.replace(&mut st, Session::authenticating())
    }

    /// Persist the credential and become `Authenticated`.
    pub fn set(&self, credential: Credential, identity: Identity) {
        self.persist(&credential);
        let mut st = self.inner.state.write();
        info!(target: "careerscope::session", "session authenticated user_id={} email={}", identity.id, identity.email);
        self.replace(&mut st, Session::authenticated(credential, identity));
    }

    /// Become `Authenticated` with an already persisted credential, but only if
    /// nothing replaced the session since `epoch`.
    pub(crate) fn commit_if_current(&self, epoch: u64, credential: Credential, identity: Identity) -> bool {
        let mut st = self.inner.state.write();
        if st.epoch != epoch {
            debug!(target: "careerscope::session", "discarding stale session resolution epoch={} current={}", epoch, st.epoch);
            return false;
        }
        info!(target: "careerscope::session", "session restored user_id={} email={}", identity.id, identity.email);
        self.replace(&mut st, Session::authenticated(credential, identity));
        true
    }

    /// Swap the identity of the current session, keeping its credential.
    pub(crate) fn refresh_identity(&self, credential: &Credential, identity: Identity) -> bool {
        let mut st = self.inner.state.write();
        match st.session.credential() {
            Some(c) if c == credential && st.session.is_authenticated() => {
                let cred = c.clone();
                self.replace(&mut st, Session::authenticated(cred, identity));
                true
            }
            _ => false,
        }
    }

    /// Forget the credential everywhere and become `Anonymous`.
    pub fn clear(&self) {
        if let Err(e) = self.inner.persisted.remove() {
            warn!(target: "careerscope::session", "failed to remove persisted credential: {}", e);
        }
        let mut st = self.inner.state.write();
        if st.session.status() != SessionStatus::Anonymous {
            info!(target: "careerscope::session", "session cleared");
        }
        self.replace(&mut st, Session::anonymous());
    }

    /// `clear`, but only if nothing replaced the session since `epoch`.
    pub(crate) fn clear_if_current(&self, epoch: u64) -> bool {
        if self.inner.state.read().epoch != epoch { return false; }
        self.clear();
        true
    }

    /// React to the server refusing `rejected`. A rejection of a credential the
    /// session no longer holds (a newer login replaced it) is ignored.
    pub(crate) fn reject(&self, rejected: &Credential) -> bool {
        let stale = {
            let st = self.inner.state.read();
            matches!(st.session.credential(), Some(c) if c != rejected)
        };
        if stale {
            debug!(target: "careerscope::session", "ignoring rejection of a superseded credential");
            return false;
        }
        warn!(target: "careerscope::session", "credential rejected by server; clearing session");
        self.clear();
        true
    }

    /// Rebuild the session from the persisted credential.
    ///
    /// Without a persisted credential this returns `Anonymous` and performs no network
    /// call. Otherwise the identity is resolved; any failure (including network errors)
    /// drops the persisted credential.
    pub async fn restore(&self, resolver: &dyn IdentityResolver) -> Session {
        let saved = match self.inner.persisted.load() {
            Ok(c) => c,
            Err(e) => {
                warn!(target: "careerscope::session", "unreadable persisted credential, discarding: {}", e);
                self.clear();
                return self.current();
            }
        };
        let Some(credential) = saved else {
            debug!(target: "careerscope::session", "no persisted credential; starting anonymous");
            let mut st = self.inner.state.write();
            self.replace(&mut st, Session::anonymous());
            return st.session.clone();
        };

        let epoch = self.begin();
        match resolver.resolve_identity(&credential).await {
            Ok(identity) => {
                self.commit_if_current(epoch, credential, identity);
                self.current()
            }
            Err(e) => {
                warn!(target: "careerscope::session", "session restore failed: {}", e);
                self.clear_if_current(epoch);
                self.current()
            }
        }
    }

    fn persist(&self, credential: &Credential) {
        // best-effort: a failed write still leaves a usable in-memory session
        if let Err(e) = self.inner.persisted.save(credential) {
            warn!(target: "careerscope::session", "failed to persist credential: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
