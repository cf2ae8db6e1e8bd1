use super::*;
use crate::error::ClientError;
use crate::identity::credentials::MemoryCredentialStore;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FixedResolver {
    calls: AtomicUsize,
    answer: Result<Identity, ClientError>,
}

impl FixedResolver {
    fn ok(identity: Identity) -> Self { Self { calls: AtomicUsize::new(0), answer: Ok(identity) } }
    fn err(e: ClientError) -> Self { Self { calls: AtomicUsize::new(0), answer: Err(e) } }
}

#[async_trait]
impl IdentityResolver for FixedResolver {
    async fn resolve_identity(&self, _credential: &Credential) -> ClientResult<Identity> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

fn store_with(persisted: Arc<MemoryCredentialStore>) -> SessionStore { SessionStore::new(persisted) }

#[tokio::test]
async fn restore_without_credential_is_anonymous_and_offline() {
    let persisted = Arc::new(MemoryCredentialStore::new());
    let store = store_with(persisted);
    let resolver = FixedResolver::ok(Identity::new(1, "user@x.com"));

    let s = store.restore(&resolver).await;
    assert_eq!(s.status(), SessionStatus::Anonymous);
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn restore_resolves_identity_for_saved_credential() {
    let persisted = Arc::new(MemoryCredentialStore::with_credential(Credential::new("t1")));
    let store = store_with(persisted.clone());
    let resolver = FixedResolver::ok(Identity::new(1, "user@x.com"));

    let s = store.restore(&resolver).await;
    assert!(s.is_authenticated());
    assert_eq!(s.credential(), Some(&Credential::new("t1")));
    assert_eq!(s.identity().map(|i| i.email.as_str()), Some("user@x.com"));
    assert_eq!(store.current(), s);
    assert_eq!(persisted.load().unwrap(), Some(Credential::new("t1")));
}

#[tokio::test]
async fn failed_restore_drops_saved_credential() {
    let persisted = Arc::new(MemoryCredentialStore::with_credential(Credential::new("stale")));
    let store = store_with(persisted.clone());
    let resolver = FixedResolver::err(ClientError::network("connection refused"));

    let s = store.restore(&resolver).await;
    assert_eq!(s.status(), SessionStatus::Anonymous);
    assert_eq!(s.credential(), None);
    assert_eq!(persisted.load().unwrap(), None);
}

#[test]
fn set_and_clear_replace_whole_session() {
    let persisted = Arc::new(MemoryCredentialStore::new());
    let store = store_with(persisted.clone());

    store.set(Credential::new("t1"), Identity::new(7, "a@b.c"));
    let s = store.current();
    assert!(s.is_authenticated());
    assert!(s.credential().is_some() && s.identity().is_some());
    assert_eq!(persisted.load().unwrap(), Some(Credential::new("t1")));

    store.clear();
    let s = store.current();
    assert_eq!(s, Session::anonymous());
    assert_eq!(persisted.load().unwrap(), None);
}

#[test]
fn authenticating_exposes_no_partial_fields() {
    let store = store_with(Arc::new(MemoryCredentialStore::new()));
    store.begin();
    let s = store.current();
    assert_eq!(s.status(), SessionStatus::Authenticating);
    assert!(s.credential().is_none());
    assert!(s.identity().is_none());
}

#[test]
fn stale_commit_is_discarded() {
    let store = store_with(Arc::new(MemoryCredentialStore::new()));
    let first = store.begin();
    store.set(Credential::new("newer"), Identity::new(2, "n@x.com"));

    assert!(!store.commit_if_current(first, Credential::new("older"), Identity::new(1, "o@x.com")));
    assert!(!store.clear_if_current(first));
    assert_eq!(store.current().credential(), Some(&Credential::new("newer")));
}

#[test]
fn rejection_of_superseded_credential_is_ignored() {
    let store = store_with(Arc::new(MemoryCredentialStore::new()));
    store.set(Credential::new("t2"), Identity::new(1, "u@x.com"));

    assert!(!store.reject(&Credential::new("t1")));
    assert!(store.current().is_authenticated());

    assert!(store.reject(&Credential::new("t2")));
    assert_eq!(store.current().status(), SessionStatus::Anonymous);
}

#[tokio::test]
async fn subscribers_observe_transitions() {
    let store = store_with(Arc::new(MemoryCredentialStore::new()));
    let mut rx = store.subscribe();

    store.set(Credential::new("t1"), Identity::new(1, "u@x.com"));
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().is_authenticated());

    store.clear();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().status(), SessionStatus::Anonymous);
}

#[test]
fn clones_share_state() {
    let a = store_with(Arc::new(MemoryCredentialStore::new()));
    let b = a.clone();
    a.set(Credential::new("t1"), Identity::new(1, "u@x.com"));
    assert!(b.current().is_authenticated());
}
