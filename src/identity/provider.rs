use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::credentials::Credential;
use super::principal::Identity;
use super::session::{IdentityResolver, Session, SessionStore};
use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, ApiResponse, RequestAuthenticator, Transport};

/// Minimum password length accepted by the registration endpoint.
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

impl RegisterRequest {
    /// Checks the server would reject anyway; failing here saves the round trip.
    pub fn validate(&self) -> ClientResult<()> {
        check_email(self.email.trim())?;
        check_password(&self.password)
    }
}

/// Fields to change on the signed-in account. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub password: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool { self.email.is_none() && self.display_name.is_none() && self.password.is_none() }

    pub fn validate(&self) -> ClientResult<()> {
        if self.is_empty() {
            return Err(ClientError::validation("nothing to update"));
        }
        if let Some(email) = &self.email {
            check_email(email.trim())?;
        }
        if let Some(pw) = &self.password {
            check_password(pw)?;
        }
        Ok(())
    }

    fn body(&self) -> serde_json::Value {
        let mut body = json!({});
        if let Some(e) = &self.email {
            body["email"] = json!(e.trim());
        }
        if let Some(n) = &self.display_name {
            body["full_name"] = json!(n.trim());
        }
        if let Some(p) = &self.password {
            body["password"] = json!(p);
        }
        body
    }
}

fn check_email(email: &str) -> ClientResult<()> {
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ClientError::validation(format!("'{}' is not a valid email address", email))),
    }
}

fn check_password(password: &str) -> ClientResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::validation(format!("password must be at least {} characters", MIN_PASSWORD_LEN)));
    }
    Ok(())
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Login, registration and logout against the remote identity service.
#[derive(Clone)]
pub struct AuthGateway {
    http: RequestAuthenticator,
    store: SessionStore,
}

impl AuthGateway {
    pub fn new(http: RequestAuthenticator) -> Self {
        let store = http.session().clone();
        Self { http, store }
    }

    pub fn session(&self) -> &SessionStore { &self.store }

    /// Rebuild the session from the persisted credential.
    pub async fn restore(&self) -> Session { self.store.restore(self).await }

    /// Exchange email/password for a credential, then resolve the identity behind it.
    ///
    /// The session is only replaced once both steps succeed, so a failed login leaves
    /// any existing session untouched and never grants a partial one.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let req = LoginRequest { email: email.trim().to_string(), password: password.to_string() };
        let resp = self
            .http
            .send(
                ApiRequest::post("auth/login")
                    .anonymous()
                    .form(vec![("username", req.email.as_str()), ("password", req.password.as_str())]),
            )
            .await?;
        if !resp.is_success() {
            let err = login_error(&resp);
            info!(target: "careerscope::auth", "login refused email={} status={}", req.email, resp.status);
            return Err(err);
        }
        let token: TokenResponse = resp.json()?;
        if token.access_token.is_empty() {
            return Err(ClientError::decode("login response carried an empty access_token"));
        }
        let credential = Credential::new(token.access_token);
        let identity = self.resolve_identity(&credential).await?;
        info!(target: "careerscope::auth", "login ok user_id={} email={}", identity.id, identity.email);
        self.store.set(credential, identity);
        Ok(self.store.current())
    }

    /// Create an account. Never touches the session, whatever the outcome.
    pub async fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> ClientResult<()> {
        let req = RegisterRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            display_name: display_name.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
        };
        req.validate()?;
        let mut body = json!({"email": req.email, "password": req.password});
        if let Some(n) = &req.display_name {
            body["full_name"] = json!(n);
        }
        let resp = self.http.send(ApiRequest::post("auth/register").anonymous().json(body)).await?;
        if !resp.is_success() {
            return Err(register_error(&resp));
        }
        info!(target: "careerscope::auth", "account registered email={}", req.email);
        Ok(())
    }

    /// Drop the local session. There is no server-side invalidation endpoint, and
    /// local teardown never waits on the network.
    pub fn logout(&self) {
        self.store.clear();
        info!(target: "careerscope::auth", "logged out");
    }

    /// Re-fetch the profile of the signed-in user and refresh it in the session.
    pub async fn current_user(&self) -> ClientResult<Identity> {
        let Some(credential) = self.store.current().credential().cloned() else {
            return Err(ClientError::auth_rejected("not signed in"));
        };
        let identity: Identity = self.http.send(ApiRequest::get("users/me")).await?.error_for_status()?.json()?;
        if !self.store.refresh_identity(&credential, identity.clone()) {
            debug!(target: "careerscope::auth", "session changed while refreshing profile; not applied");
        }
        Ok(identity)
    }

    /// Change email, display name or password of the signed-in account and swap the
    /// returned profile into the session. The credential is kept.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<Identity> {
        update.validate()?;
        let Some(credential) = self.store.current().credential().cloned() else {
            return Err(ClientError::auth_rejected("not signed in"));
        };
        let resp = self.http.send(ApiRequest::put("users/me").json(update.body())).await?;
        if !resp.is_success() {
            return Err(register_error(&resp));
        }
        let identity: Identity = resp.json()?;
        if self.store.refresh_identity(&credential, identity.clone()) {
            info!(target: "careerscope::auth", "profile updated user_id={}", identity.id);
        } else {
            debug!(target: "careerscope::auth", "session changed while updating profile; not applied");
        }
        Ok(identity)
    }
}

#[async_trait]
impl IdentityResolver for AuthGateway {
    async fn resolve_identity(&self, credential: &Credential) -> ClientResult<Identity> {
        let resp = self.http.send(ApiRequest::get("users/me").with_credential(credential.clone())).await?;
        resp.error_for_status()?.json()
    }
}

fn login_error(resp: &ApiResponse) -> ClientError {
    let detail = resp.detail();
    match resp.status {
        400 | 401 | 403 => ClientError::invalid_credentials(detail.unwrap_or_else(|| "Incorrect email or password".into())),
        _ => ClientError::from_status(resp.status, detail),
    }
}

fn register_error(resp: &ApiResponse) -> ClientError {
    let detail = resp.detail();
    let duplicate = detail.as_deref().map(|d| d.to_ascii_lowercase().contains("already")).unwrap_or(false);
    match resp.status {
        409 => ClientError::duplicate_account(detail.unwrap_or_else(|| "account already exists".into())),
        400 if duplicate => ClientError::duplicate_account(detail.unwrap_or_default()),
        400 | 422 => ClientError::validation(detail.unwrap_or_else(|| "request rejected".into())),
        _ => ClientError::from_status(resp.status, detail),
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod provider_tests;
