use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ApiRequest, ApiResponse, AuthMode, Transport};
use crate::error::{ClientError, ClientResult};
use crate::identity::SessionStore;

/// Decorates a transport with session credentials.
///
/// Before dispatch the request's `AuthMode` is resolved into the bearer actually sent.
/// A `401` to a request that carried a credential clears the session before the
/// `AuthRejected` error reaches the caller. A `401` to an uncredentialed request is
/// returned untouched. Nothing is ever retried.
#[derive(Clone)]
pub struct RequestAuthenticator {
    inner: Arc<dyn Transport>,
    session: SessionStore,
}

impl RequestAuthenticator {
    pub fn new(inner: Arc<dyn Transport>, session: SessionStore) -> Self { Self { inner, session } }

    pub fn session(&self) -> &SessionStore { &self.session }
}

#[async_trait]
impl Transport for RequestAuthenticator {
    async fn send(&self, mut req: ApiRequest) -> ClientResult<ApiResponse> {
        req.bearer = match &req.auth {
            AuthMode::Session => self.session.current().credential().cloned(),
            AuthMode::Anonymous => None,
            AuthMode::Explicit(c) => Some(c.clone()),
        };
        let attached = req.bearer.clone();
        let path = req.path.clone();
        let resp = self.inner.send(req).await?;

        if resp.status == 401 {
            if let Some(rejected) = attached {
                debug!(target: "careerscope::http", "credential rejected on '{}'", path);
                self.session.reject(&rejected);
                let msg = resp.detail().unwrap_or_else(|| "credential rejected".to_string());
                return Err(ClientError::auth_rejected(msg));
            }
        }
        Ok(resp)
    }
}
