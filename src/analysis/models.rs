use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Server-side progression of an analysis job. Ordered: a job only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Position in the progression. Completed and Failed share the last rank.
    pub fn rank(&self) -> u32 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, JobStatus::Completed | JobStatus::Failed) }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CareerType {
    Corporate,
    Freelance,
    Entrepreneurship,
}

impl CareerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CareerType::Corporate => "corporate",
            CareerType::Freelance => "freelance",
            CareerType::Entrepreneurship => "entrepreneurship",
        }
    }
}

impl fmt::Display for CareerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for CareerType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "corporate" => Ok(CareerType::Corporate),
            "freelance" => Ok(CareerType::Freelance),
            "entrepreneurship" => Ok(CareerType::Entrepreneurship),
            other => Err(ClientError::validation(format!(
                "unknown career type '{}' (expected corporate, freelance or entrepreneurship)",
                other
            ))),
        }
    }
}

/// One career recommendation produced by a completed analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerPath {
    pub id: i64,
    pub career_type: CareerType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub skill_match_percentage: f64,
    #[serde(default)]
    pub skill_gaps: Option<Vec<String>>,
    #[serde(default)]
    pub salary_range_min: Option<i64>,
    #[serde(default)]
    pub salary_range_max: Option<i64>,
    #[serde(default)]
    pub market_demand: Option<String>,
    #[serde(default)]
    pub recommended_courses: Option<Vec<serde_json::Value>>,
    /// Weeks of preparation the recommendation estimates.
    #[serde(default)]
    pub estimated_preparation_time: Option<i64>,
    #[serde(default)]
    pub pros: Option<Vec<String>>,
    #[serde(default)]
    pub cons: Option<Vec<String>>,
    #[serde(default)]
    pub next_steps: Option<Vec<String>>,
    pub confidence_score: f64,
}

impl CareerPath {
    pub fn salary_range(&self) -> Option<(i64, i64)> {
        match (self.salary_range_min, self.salary_range_max) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            (Some(v), None) | (None, Some(v)) => Some((v, v)),
            (None, None) => None,
        }
    }
}

/// Status snapshot of one analysis job, plus its career paths once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: i64,
    #[serde(default)]
    pub document_id: Option<i64>,
    pub status: JobStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Seconds spent processing; set once completed.
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Filled in by the client after a completed status, never by the status endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<CareerPath>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    InProgress,
    Completed,
    /// The remote analysis failed. This is a terminal snapshot, not a client error.
    JobFailed(String),
}

impl AnalysisJob {
    pub fn outcome(&self) -> JobOutcome {
        match self.status {
            JobStatus::Pending | JobStatus::Processing => JobOutcome::InProgress,
            JobStatus::Completed => JobOutcome::Completed,
            JobStatus::Failed => JobOutcome::JobFailed(
                self.error_message.clone().unwrap_or_else(|| "analysis failed".to_string()),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub document_type: String,
}

/// Row of the analysis history listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub id: i64,
    pub document_id: i64,
    pub status: JobStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub document: Option<DocumentInfo>,
    #[serde(default)]
    pub career_recommendations: Option<Vec<serde_json::Value>>,
}

/// The backend emits naive ISO timestamps (no offset) which are UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|n| n.and_utc())
    }
}
