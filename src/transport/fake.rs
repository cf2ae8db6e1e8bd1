use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::{ClientError, ClientResult};

/// Scripted in-process transport for unit tests. Responses are queued per
/// `(method, path)`; the last queued response for a route repeats once the queue
/// has a single entry left.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<ClientResult<ApiResponse>>>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self { Self::default() }

    pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) -> &Self {
        self.push(method, path, Ok(ApiResponse::json_body(status, &body)))
    }

    pub(crate) fn fail(&self, method: Method, path: &str, err: ClientError) -> &Self {
        self.push(method, path, Err(err))
    }

    fn push(&self, method: Method, path: &str, r: ClientResult<ApiResponse>) -> &Self {
        self.routes.lock().entry((method, path.to_string())).or_default().push_back(r);
        self
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> { self.log.lock().clone() }

    pub(crate) fn count(&self, method: Method, path: &str) -> usize {
        self.log.lock().iter().filter(|r| r.method == method && r.path == path).count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, req: ApiRequest) -> ClientResult<ApiResponse> {
        self.log.lock().push(req.clone());
        let mut routes = self.routes.lock();
        let Some(q) = routes.get_mut(&(req.method, req.path.clone())) else {
            return Ok(ApiResponse::json_body(404, &serde_json::json!({"detail": "Not Found"})));
        };
        if q.len() > 1 {
            q.pop_front().unwrap_or_else(|| Err(ClientError::network("empty script")))
        } else {
            q.front().cloned().unwrap_or_else(|| Err(ClientError::network("empty script")))
        }
    }
}
