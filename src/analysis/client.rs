use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::models::{AnalysisJob, AnalysisSummary, CareerPath, CareerType, JobStatus};
use crate::error::{ClientError, ClientResult};
use crate::poller::{JobStatusPoller, PollObserver, StatusProbe, Subscription};
use crate::transport::{ApiRequest, RequestAuthenticator, Transport};

/// What `AnalysisJobClient::watch` reports.
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// A status snapshot. The completed one carries its career paths in `result`.
    Snapshot(AnalysisJob),
    /// The status fetch failed; polling has stopped.
    StatusError(ClientError),
    /// The job completed but its career paths could not be retrieved. Always follows
    /// the completed snapshot.
    ResultError(ClientError),
}

#[inline]
fn job_path(job_id: &str) -> String { format!("analysis/{}", urlencoding::encode(job_id.trim())) }

#[inline]
fn career_paths_path(job_id: &str) -> String { format!("{}/career-paths", job_path(job_id)) }

async fn fetch_job(http: &RequestAuthenticator, job_id: &str) -> ClientResult<AnalysisJob> {
    http.send(ApiRequest::get(job_path(job_id))).await?.error_for_status()?.json()
}

async fn fetch_career_paths(
    http: &RequestAuthenticator,
    job_id: &str,
    career_type: Option<CareerType>,
) -> ClientResult<Vec<CareerPath>> {
    let mut req = ApiRequest::get(career_paths_path(job_id));
    if let Some(t) = career_type {
        req = req.query("career_type", t.as_str());
    }
    http.send(req).await?.error_for_status()?.json()
}

/// Analysis job operations on top of the authenticated transport.
#[derive(Clone)]
pub struct AnalysisJobClient {
    http: RequestAuthenticator,
    poller: JobStatusPoller,
}

impl AnalysisJobClient {
    pub fn new(http: RequestAuthenticator, poller: JobStatusPoller) -> Self { Self { http, poller } }

    pub fn poller(&self) -> &JobStatusPoller { &self.poller }

    /// Queue a new analysis of an uploaded document.
    pub async fn submit(&self, document_id: i64) -> ClientResult<AnalysisJob> {
        let job: AnalysisJob = self
            .http
            .send(ApiRequest::post("analysis/").json(json!({"document_id": document_id})))
            .await?
            .error_for_status()?
            .json()?;
        info!(target: "careerscope::analysis", "submitted analysis id={} document_id={} status={}", job.id, document_id, job.status);
        Ok(job)
    }

    pub async fn get(&self, job_id: &str) -> ClientResult<AnalysisJob> { fetch_job(&self.http, job_id).await }

    pub async fn career_paths(&self, job_id: &str, career_type: Option<CareerType>) -> ClientResult<Vec<CareerPath>> {
        fetch_career_paths(&self.http, job_id, career_type).await
    }

    /// Most recent analyses first, as ordered by the server.
    pub async fn list(&self, skip: u32, limit: u32, document_id: Option<i64>) -> ClientResult<Vec<AnalysisSummary>> {
        let mut req = ApiRequest::get("analysis/").query("skip", skip).query("limit", limit);
        if let Some(doc) = document_id {
            req = req.query("document_id", doc);
        }
        self.http.send(req).await?.error_for_status()?.json()
    }

    /// Poll `job_id` until it completes or fails. Once completed, its career paths are
    /// fetched one time and attached to the delivered snapshot.
    pub fn watch<F>(&self, job_id: &str, observer: F) -> Subscription
    where
        F: FnMut(AnalysisEvent) + Send + 'static,
    {
        let job_id = job_id.trim().to_string();
        debug!(target: "careerscope::analysis", "watching analysis id={}", job_id);
        let probe = JobProbe { http: self.http.clone(), job_id: job_id.clone() };
        self.poller.start(job_id, probe, EventAdapter(observer))
    }

    /// Drive `watch` to the end. Returns the terminal snapshot (completed or failed),
    /// or the first error reported.
    pub async fn watch_until_terminal(&self, job_id: &str) -> ClientResult<AnalysisJob> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = self.watch(job_id, move |ev| {
            let _ = tx.send(ev);
        });
        let mut last = None;
        while let Some(ev) = rx.recv().await {
            match ev {
                AnalysisEvent::Snapshot(job) => last = Some(job),
                AnalysisEvent::StatusError(e) | AnalysisEvent::ResultError(e) => return Err(e),
            }
        }
        let state = sub.finished().await;
        last.filter(|j| j.status.is_terminal())
            .ok_or_else(|| ClientError::network(format!("polling of analysis {} stopped early ({:?})", job_id, state)))
    }
}

/// One status fetch; on `Completed` also the career paths.
struct Probed {
    job: AnalysisJob,
    result_error: Option<ClientError>,
}

struct JobProbe {
    http: RequestAuthenticator,
    job_id: String,
}

#[async_trait]
impl StatusProbe for JobProbe {
    type Snapshot = Probed;

    async fn fetch_status(&self) -> ClientResult<Probed> {
        let mut job = fetch_job(&self.http, &self.job_id).await?;
        let mut result_error = None;
        if job.status == JobStatus::Completed {
            match fetch_career_paths(&self.http, &self.job_id, None).await {
                Ok(paths) => job.result = Some(paths),
                Err(e) => {
                    warn!(target: "careerscope::analysis", "analysis id={} completed but career paths failed: {}", self.job_id, e);
                    result_error = Some(ClientError::result_fetch(self.job_id.clone(), &e));
                }
            }
        }
        Ok(Probed { job, result_error })
    }

    fn is_terminal(&self, p: &Probed) -> bool { p.job.status.is_terminal() }

    fn progress(&self, p: &Probed) -> u32 { p.job.status.rank() }
}

struct EventAdapter<F>(F);

impl<F> PollObserver<Probed> for EventAdapter<F>
where
    F: FnMut(AnalysisEvent) + Send + 'static,
{
    fn on_update(&mut self, p: Probed) {
        (self.0)(AnalysisEvent::Snapshot(p.job));
        if let Some(e) = p.result_error {
            (self.0)(AnalysisEvent::ResultError(e));
        }
    }

    fn on_error(&mut self, error: ClientError) { (self.0)(AnalysisEvent::StatusError(error)) }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
