use super::*;
use crate::identity::{CredentialStore, MemoryCredentialStore, SessionStatus};
use crate::transport::fake::FakeTransport;
use crate::transport::{Body, Method};
use std::sync::Arc;

struct Harness {
    fake: Arc<FakeTransport>,
    persisted: Arc<MemoryCredentialStore>,
    store: SessionStore,
    gateway: AuthGateway,
}

fn harness() -> Harness {
    let fake = Arc::new(FakeTransport::new());
    let persisted = Arc::new(MemoryCredentialStore::new());
    let store = SessionStore::new(persisted.clone());
    let gateway = AuthGateway::new(RequestAuthenticator::new(fake.clone(), store.clone()));
    Harness { fake, persisted, store, gateway }
}

#[tokio::test]
async fn login_authenticates_with_issued_credential() {
    let h = harness();
    h.fake.respond(Method::Post, "auth/login", 200, json!({"access_token": "t1", "token_type": "bearer"}));
    h.fake.respond(Method::Get, "users/me", 200, json!({"id": 1, "email": "user@x.com"}));

    let s = h.gateway.login("user@x.com", "pw123456").await.unwrap();
    assert!(s.is_authenticated());
    let cur = h.store.current();
    assert_eq!(cur.status(), SessionStatus::Authenticated);
    assert_eq!(cur.identity().map(|i| i.id), Some(1));
    assert_eq!(h.persisted.load().unwrap(), Some(Credential::new("t1")));

    let reqs = h.fake.requests();
    assert_eq!(reqs[0].bearer, None);
    assert_eq!(
        reqs[0].body,
        Body::Form(vec![("username".into(), "user@x.com".into()), ("password".into(), "pw123456".into())])
    );
    assert_eq!(reqs[1].bearer, Some(Credential::new("t1")));
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials_and_keeps_session() {
    let h = harness();
    h.store.set(Credential::new("old"), Identity::new(5, "old@x.com"));
    h.fake.respond(Method::Post, "auth/login", 401, json!({"detail": "Incorrect email or password"}));

    let err = h.gateway.login("user@x.com", "nope").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidCredentials { .. }));
    assert_eq!(err.message(), "Incorrect email or password");
    assert_eq!(h.store.current().credential(), Some(&Credential::new("old")));
    assert_eq!(h.fake.count(Method::Get, "users/me"), 0);
}

#[tokio::test]
async fn identity_failure_never_grants_partial_session() {
    let h = harness();
    h.fake.respond(Method::Post, "auth/login", 200, json!({"access_token": "t1"}));
    h.fake.fail(Method::Get, "users/me", ClientError::network("connection reset"));

    let err = h.gateway.login("user@x.com", "pw123456").await.unwrap_err();
    assert!(err.is_transient());
    let cur = h.store.current();
    assert_eq!(cur.status(), SessionStatus::Anonymous);
    assert!(cur.credential().is_none());
    assert_eq!(h.persisted.load().unwrap(), None);
}

#[tokio::test]
async fn register_never_touches_session() {
    let h = harness();
    h.fake.respond(Method::Post, "auth/register", 200, json!({"id": 2, "email": "new@x.com"}));
    h.gateway.register("new@x.com", "longenough", Some("New User")).await.unwrap();
    assert_eq!(h.store.current(), Session::anonymous());
    match &h.fake.requests()[0].body {
        Body::Json(v) => {
            assert_eq!(v["full_name"], "New User");
            assert_eq!(v["email"], "new@x.com");
        }
        other => panic!("unexpected body {:?}", other),
    }

    // failure path, with an existing session
    let h2 = harness();
    h2.fake.respond(Method::Post, "auth/register", 400, json!({"detail": "Email already registered"}));
    h2.store.set(Credential::new("t1"), Identity::new(1, "u@x.com"));
    let before = h2.store.current();
    let err = h2.gateway.register("u@x.com", "longenough", None).await.unwrap_err();
    assert!(matches!(err, ClientError::DuplicateAccount { .. }));
    assert_eq!(h2.store.current(), before);
}

#[tokio::test]
async fn register_validates_locally_without_network() {
    let h = harness();
    let err = h.gateway.register("not-an-email", "longenough", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));
    let err = h.gateway.register("a@b.c", "short", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));
    assert!(h.fake.requests().is_empty());
}

#[tokio::test]
async fn register_maps_server_validation() {
    let h = harness();
    h.fake.respond(Method::Post, "auth/register", 422, json!({"detail": [{"loc": ["body", "email"], "msg": "value is not a valid email address"}]}));
    let err = h.gateway.register("x@y", "longenough", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));
    assert_eq!(err.message(), "email: value is not a valid email address");
}

#[tokio::test]
async fn logout_is_local_and_infallible() {
    let h = harness();
    h.store.set(Credential::new("t1"), Identity::new(1, "u@x.com"));
    h.gateway.logout();
    assert_eq!(h.store.current().status(), SessionStatus::Anonymous);
    assert_eq!(h.persisted.load().unwrap(), None);
    assert!(h.fake.requests().is_empty());
}

#[tokio::test]
async fn restore_goes_through_gateway() {
    let h = harness();
    h.persisted.save(&Credential::new("t9")).unwrap();
    h.fake.respond(Method::Get, "users/me", 200, json!({"id": 9, "email": "nine@x.com", "full_name": "Nine"}));

    let s = h.gateway.restore().await;
    assert!(s.is_authenticated());
    assert_eq!(s.identity().map(|i| i.label()), Some("Nine"));
}

#[tokio::test]
async fn restore_with_rejected_credential_ends_anonymous() {
    let h = harness();
    h.persisted.save(&Credential::new("expired")).unwrap();
    h.fake.respond(Method::Get, "users/me", 401, json!({"detail": "Could not validate credentials"}));

    let s = h.gateway.restore().await;
    assert_eq!(s.status(), SessionStatus::Anonymous);
    assert_eq!(h.persisted.load().unwrap(), None);
}

#[tokio::test]
async fn current_user_refreshes_identity() {
    let h = harness();
    h.store.set(Credential::new("t1"), Identity::new(1, "u@x.com"));
    h.fake.respond(Method::Get, "users/me", 200, json!({"id": 1, "email": "u@x.com", "full_name": "Renamed"}));

    let id = h.gateway.current_user().await.unwrap();
    assert_eq!(id.label(), "Renamed");
    assert_eq!(h.store.current().identity().and_then(|i| i.display_name.clone()).as_deref(), Some("Renamed"));
}

#[tokio::test]
async fn current_user_requires_session() {
    let h = harness();
    let err = h.gateway.current_user().await.unwrap_err();
    assert!(err.is_auth_rejected());
    assert!(h.fake.requests().is_empty());
}

#[tokio::test]
async fn update_profile_swaps_identity_and_keeps_credential() {
    let h = harness();
    h.store.set(Credential::new("t1"), Identity::new(1, "u@x.com"));
    h.fake.respond(Method::Put, "users/me", 200, json!({"id": 1, "email": "new@x.com", "full_name": "Ada"}));

    let update = ProfileUpdate { email: Some(" new@x.com ".into()), display_name: Some("Ada".into()), password: None };
    let id = h.gateway.update_profile(&update).await.unwrap();
    assert_eq!(id.email, "new@x.com");

    let cur = h.store.current();
    assert!(cur.is_authenticated());
    assert_eq!(cur.credential(), Some(&Credential::new("t1")));
    assert_eq!(cur.identity().map(|i| i.label()), Some("Ada"));

    let reqs = h.fake.requests();
    assert_eq!(reqs[0].bearer, Some(Credential::new("t1")));
    assert_eq!(reqs[0].body, Body::Json(json!({"email": "new@x.com", "full_name": "Ada"})));
}

#[tokio::test]
async fn update_profile_email_clash_is_duplicate_account() {
    let h = harness();
    h.store.set(Credential::new("t1"), Identity::new(1, "u@x.com"));
    h.fake.respond(Method::Put, "users/me", 400, json!({"detail": "Email already registered"}));

    let update = ProfileUpdate { email: Some("taken@x.com".into()), ..Default::default() };
    let err = h.gateway.update_profile(&update).await.unwrap_err();
    assert!(matches!(err, ClientError::DuplicateAccount { .. }));
    assert_eq!(h.store.current().identity().map(|i| i.email.as_str()), Some("u@x.com"));
}

#[tokio::test]
async fn update_profile_validates_locally() {
    let h = harness();
    h.store.set(Credential::new("t1"), Identity::new(1, "u@x.com"));
    for update in [
        ProfileUpdate::default(),
        ProfileUpdate { password: Some("short".into()), ..Default::default() },
        ProfileUpdate { email: Some("nope".into()), ..Default::default() },
    ] {
        let err = h.gateway.update_profile(&update).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation { .. }));
    }
    assert!(h.fake.requests().is_empty());
}

#[tokio::test]
async fn update_profile_requires_session() {
    let h = harness();
    let update = ProfileUpdate { display_name: Some("Ada".into()), ..Default::default() };
    assert!(h.gateway.update_profile(&update).await.unwrap_err().is_auth_rejected());
    assert!(h.fake.requests().is_empty());
}
