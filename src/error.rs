//! Unified client error model and mapping helpers.
//! Every fallible operation in the crate returns `ClientError`; protocol-specific
//! failures (HTTP status, decode, persistence) are folded into one of its kinds here.

use serde::Serialize;

#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientError {
    #[error("{code}: {message}")]
    InvalidCredentials { code: String, message: String },
    #[error("{code}: {message}")]
    DuplicateAccount { code: String, message: String },
    #[error("{code}: {message}")]
    Validation { code: String, message: String },
    /// A credential that was attached to a request was refused by the server.
    #[error("{code}: {message}")]
    AuthRejected { code: String, message: String },
    #[error("{code}: {message}")]
    Network { code: String, message: String },
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },
    #[error("{code}: HTTP {status}: {message}")]
    Api { code: String, status: u16, message: String },
    #[error("{code}: {message}")]
    Decode { code: String, message: String },
    /// The analysis job completed but its detail payload could not be fetched.
    #[error("{code}: analysis {job_id}: {message}")]
    ResultFetch { code: String, job_id: String, message: String },
    #[error("{code}: gave up after {attempts} polls: {message}")]
    PollLimitExceeded { code: String, attempts: u32, message: String },
    #[error("{code}: {message}")]
    Storage { code: String, message: String },
    #[error("{code}: {message}")]
    Config { code: String, message: String },
}

impl ClientError {
    pub fn code_str(&self) -> &str {
        match self {
            ClientError::InvalidCredentials { code, .. }
            | ClientError::DuplicateAccount { code, .. }
            | ClientError::Validation { code, .. }
            | ClientError::AuthRejected { code, .. }
            | ClientError::Network { code, .. }
            | ClientError::NotFound { code, .. }
            | ClientError::Api { code, .. }
            | ClientError::Decode { code, .. }
            | ClientError::ResultFetch { code, .. }
            | ClientError::PollLimitExceeded { code, .. }
            | ClientError::Storage { code, .. }
            | ClientError::Config { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ClientError::InvalidCredentials { message, .. }
            | ClientError::DuplicateAccount { message, .. }
            | ClientError::Validation { message, .. }
            | ClientError::AuthRejected { message, .. }
            | ClientError::Network { message, .. }
            | ClientError::NotFound { message, .. }
            | ClientError::Api { message, .. }
            | ClientError::Decode { message, .. }
            | ClientError::ResultFetch { message, .. }
            | ClientError::PollLimitExceeded { message, .. }
            | ClientError::Storage { message, .. }
            | ClientError::Config { message, .. } => message.as_str(),
        }
    }

    pub fn invalid_credentials<S: Into<String>>(msg: S) -> Self { ClientError::InvalidCredentials { code: "invalid_credentials".into(), message: msg.into() } }
    pub fn duplicate_account<S: Into<String>>(msg: S) -> Self { ClientError::DuplicateAccount { code: "duplicate_account".into(), message: msg.into() } }
    pub fn validation<S: Into<String>>(msg: S) -> Self { ClientError::Validation { code: "validation_error".into(), message: msg.into() } }
    pub fn auth_rejected<S: Into<String>>(msg: S) -> Self { ClientError::AuthRejected { code: "auth_rejected".into(), message: msg.into() } }
    pub fn network<S: Into<String>>(msg: S) -> Self { ClientError::Network { code: "network_error".into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(msg: S) -> Self { ClientError::NotFound { code: "not_found".into(), message: msg.into() } }
    pub fn api<S: Into<String>>(status: u16, msg: S) -> Self { ClientError::Api { code: "api_error".into(), status, message: msg.into() } }
    pub fn decode<S: Into<String>>(msg: S) -> Self { ClientError::Decode { code: "decode_error".into(), message: msg.into() } }
    pub fn storage<S: Into<String>>(msg: S) -> Self { ClientError::Storage { code: "storage_error".into(), message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { ClientError::Config { code: "config_error".into(), message: msg.into() } }

    pub fn poll_limit(attempts: u32) -> Self {
        ClientError::PollLimitExceeded {
            code: "poll_limit_exceeded".into(),
            attempts,
            message: "resource did not reach a terminal state".into(),
        }
    }

    /// Wrap the failure of a detail fetch that followed a successful job.
    pub fn result_fetch<S: Into<String>>(job_id: S, cause: &ClientError) -> Self {
        ClientError::ResultFetch {
            code: "result_fetch_error".into(),
            job_id: job_id.into(),
            message: cause.to_string(),
        }
    }

    /// Generic mapping of a non-success HTTP status. Operations refine this where the
    /// same status means different things (login vs. register).
    pub fn from_status(status: u16, detail: Option<String>) -> Self {
        let msg = detail.unwrap_or_else(|| format!("request failed with HTTP {}", status));
        match status {
            401 => ClientError::auth_rejected(msg),
            404 => ClientError::not_found(msg),
            409 => ClientError::duplicate_account(msg),
            400 | 422 => ClientError::validation(msg),
            _ => ClientError::api(status, msg),
        }
    }

    /// Errors the user can fix by changing their input.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidCredentials { .. } | ClientError::DuplicateAccount { .. } | ClientError::Validation { .. }
        )
    }

    /// Errors a caller may reasonably retry. This layer never retries on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Network { .. } => true,
            ClientError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_auth_rejected(&self) -> bool { matches!(self, ClientError::AuthRejected { .. }) }
}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::decode(err.to_string())
        } else if err.is_timeout() {
            ClientError::network(format!("request timed out: {}", err))
        } else {
            ClientError::network(err.to_string())
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self { ClientError::storage(err.to_string()) }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self { ClientError::decode(err.to_string()) }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
