//!
//! careerscope transport
//! ---------------------
//! Outbound requests are plain values (`ApiRequest`) handed to a `Transport`. The
//! HTTP implementation wraps `reqwest`; tests inject scripted fakes. Transports only
//! fail on connection-level problems: every HTTP status comes back as an
//! `ApiResponse` for the caller to interpret.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::identity::Credential;

mod authenticator;
#[cfg(test)]
pub(crate) mod fake;

pub use authenticator::RequestAuthenticator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// Which credential, if any, a request should carry.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthMode {
    /// Whatever the session store currently holds.
    Session,
    /// Never attach a credential (login, register).
    Anonymous,
    /// A candidate credential that is not in the session yet.
    Explicit(Credential),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `analysis/42`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
    pub auth: AuthMode,
    /// Credential actually attached; filled in by `RequestAuthenticator`.
    pub bearer: Option<Credential>,
}

impl ApiRequest {
    pub fn new<S: Into<String>>(method: Method, path: S) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: Body::Empty, auth: AuthMode::Session, bearer: None }
    }

    pub fn get<S: Into<String>>(path: S) -> Self { Self::new(Method::Get, path) }
    pub fn post<S: Into<String>>(path: S) -> Self { Self::new(Method::Post, path) }
    pub fn put<S: Into<String>>(path: S) -> Self { Self::new(Method::Put, path) }

    pub fn json(mut self, body: serde_json::Value) -> Self { self.body = Body::Json(body); self }

    pub fn form<K: Into<String>, V: Into<String>>(mut self, pairs: Vec<(K, V)>) -> Self {
        self.body = Body::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn query<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn anonymous(mut self) -> Self { self.auth = AuthMode::Anonymous; self }

    pub fn with_credential(mut self, credential: Credential) -> Self { self.auth = AuthMode::Explicit(credential); self }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self { Self { status, body } }

    pub fn json_body(status: u16, v: &serde_json::Value) -> Self { Self { status, body: v.to_string().into_bytes() } }

    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    pub fn text(&self) -> String { String::from_utf8_lossy(&self.body).into_owned() }

    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ClientError::decode(format!("unexpected response body (HTTP {}): {}", self.status, e)))
    }

    /// Human-readable `detail` from an error body. A validation `detail` (a list of
    /// `{loc, msg}` objects) is flattened into one line.
    pub fn detail(&self) -> Option<String> {
        let v: serde_json::Value = serde_json::from_slice(&self.body).ok()?;
        match v.get("detail")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let msgs: Vec<String> = items
                    .iter()
                    .filter_map(|it| {
                        let msg = it.get("msg").and_then(|m| m.as_str())?;
                        let field = it
                            .get("loc")
                            .and_then(|l| l.as_array())
                            .and_then(|l| l.last())
                            .and_then(|f| f.as_str());
                        Some(match field {
                            Some(f) => format!("{}: {}", f, msg),
                            None => msg.to_string(),
                        })
                    })
                    .collect();
                if msgs.is_empty() { None } else { Some(msgs.join("; ")) }
            }
            other => Some(other.to_string()),
        }
    }

    /// `Ok(self)` for 2xx, the generic status mapping otherwise.
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() { return Ok(self); }
        Err(ClientError::from_status(self.status, self.detail()))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: ApiRequest) -> ClientResult<ApiResponse>;
}

/// `reqwest`-backed transport rooted at the versioned API base URL.
#[derive(Clone)]
pub struct HttpTransport {
    base: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base: &str, timeout: Duration) -> ClientResult<Self> {
        let mut base_url = Url::parse(base).map_err(|e| ClientError::config(format!("invalid base URL '{}': {}", base, e)))?;
        // relative joins drop the last segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let p = format!("{}/", base_url.path());
            base_url.set_path(&p);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { base: base_url, client })
    }

    pub fn base(&self) -> &Url { &self.base }

    pub fn url_for(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::config(format!("invalid request path '{}': {}", path, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: ApiRequest) -> ClientResult<ApiResponse> {
        let url = self.url_for(&req.path)?;
        let method = match req.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(c) = &req.bearer {
            builder = builder.bearer_auth(c.as_str());
        }
        builder = match &req.body {
            Body::Empty => builder,
            Body::Json(v) => builder.json(v),
            Body::Form(pairs) => builder.form(pairs),
        };
        debug!(target: "careerscope::http", "{} {} authenticated={}", req.method.as_str(), req.path, req.bearer.is_some());
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        debug!(target: "careerscope::http", "{} {} -> {}", req.method.as_str(), req.path, status);
        Ok(ApiResponse { status, body })
    }
}
