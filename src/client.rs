//! Assembles the session store, transport, authenticator, gateway and analysis
//! client from one `ClientConfig`.

use std::sync::Arc;

use tracing::debug;

use crate::analysis::AnalysisJobClient;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::identity::{AuthGateway, CredentialStore, FileCredentialStore, Session, SessionStore};
use crate::poller::{JobStatusPoller, PollOptions};
use crate::transport::{HttpTransport, RequestAuthenticator, Transport};

#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    store: SessionStore,
    auth: AuthGateway,
    analysis: AnalysisJobClient,
}

impl Client {
    /// HTTP transport and file-backed credentials, as configured.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        let transport = HttpTransport::new(&config.api_base_url, config.request_timeout())?;
        let persisted = FileCredentialStore::new(config.credential_path.clone());
        debug!(target: "careerscope::session", "api={} credentials={}", transport.base(), persisted.path().display());
        Ok(Self::with_parts(config, Arc::new(transport), Arc::new(persisted)))
    }

    /// Wire the client over any transport and credential store.
    pub fn with_parts(config: ClientConfig, transport: Arc<dyn Transport>, persisted: Arc<dyn CredentialStore>) -> Self {
        let store = SessionStore::new(persisted);
        let http = RequestAuthenticator::new(transport, store.clone());
        let poller = JobStatusPoller::new(
            PollOptions::new(config.poll_interval()).with_max_attempts(config.poll_max_attempts),
        );
        let auth = AuthGateway::new(http.clone());
        let analysis = AnalysisJobClient::new(http, poller);
        Self { config, store, auth, analysis }
    }

    pub fn config(&self) -> &ClientConfig { &self.config }
    pub fn session(&self) -> &SessionStore { &self.store }
    pub fn auth(&self) -> &AuthGateway { &self.auth }
    pub fn analysis(&self) -> &AnalysisJobClient { &self.analysis }

    /// Restore the persisted session; call once at startup.
    pub async fn restore(&self) -> Session { self.auth.restore().await }
}
