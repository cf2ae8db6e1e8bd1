//! Analysis jobs: submission, status snapshots, history and career paths, plus
//! watching a job through the poller until it finishes.

mod models;
mod client;

pub use models::{AnalysisJob, AnalysisSummary, CareerPath, CareerType, DocumentInfo, JobOutcome, JobStatus};
pub use client::{AnalysisEvent, AnalysisJobClient};
