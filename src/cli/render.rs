//! Text views of sessions, analysis jobs and career paths for the CLI.

use serde::Serialize;

use super::table::{render_record, render_table};
use crate::analysis::{AnalysisJob, AnalysisSummary, CareerPath, JobOutcome};
use crate::identity::{Session, SessionStatus};

/// Env var that forces JSON output when set to `json`.
pub const ENV_OUTPUT: &str = "CAREERSCOPE_OUTPUT";

pub fn json_output() -> bool {
    std::env::var(ENV_OUTPUT).map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false)
}

pub fn to_json<T: Serialize>(v: &T) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

fn opt<T: ToString>(v: Option<T>) -> String { v.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string()) }

pub fn session(s: &Session) -> String {
    match (s.status(), s.identity()) {
        (SessionStatus::Authenticated, Some(id)) => {
            let mut fields = vec![
                ("user", id.label().to_string()),
                ("email", id.email.clone()),
                ("id", id.id.to_string()),
            ];
            if let Some(exp) = s.credential().and_then(|c| c.expires_at()) {
                fields.push(("token expires", exp.to_rfc3339()));
            }
            render_record(&fields)
        }
        (SessionStatus::Authenticating, _) => "signing in…".to_string(),
        _ => "not signed in".to_string(),
    }
}

/// One line per observed status, used while watching.
pub fn status_line(job: &AnalysisJob) -> String {
    match job.outcome() {
        JobOutcome::InProgress => format!("analysis {}: {}", job.id, job.status),
        JobOutcome::Completed => match job.processing_time {
            Some(t) => format!("analysis {}: completed in {:.1}s", job.id, t),
            None => format!("analysis {}: completed", job.id),
        },
        JobOutcome::JobFailed(msg) => format!("analysis {}: failed: {}", job.id, msg),
    }
}

pub fn job(job: &AnalysisJob) -> String {
    let mut fields = vec![
        ("id", job.id.to_string()),
        ("document", opt(job.document_id)),
        ("status", job.status.to_string()),
        ("created", job.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ("processing time (s)", opt(job.processing_time.map(|t| format!("{:.1}", t)))),
    ];
    if let Some(msg) = &job.error_message {
        fields.push(("error", msg.clone()));
    }
    let mut out = render_record(&fields);
    if let Some(paths) = &job.result {
        out.push('\n');
        out.push_str(&career_paths(paths));
    }
    out
}

pub fn career_paths(paths: &[CareerPath]) -> String {
    if paths.is_empty() {
        return "no career paths".to_string();
    }
    let rows: Vec<Vec<String>> = paths
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.career_type.to_string(),
                p.title.clone(),
                format!("{:.0}%", p.skill_match_percentage),
                p.salary_range().map(|(lo, hi)| if lo == hi { lo.to_string() } else { format!("{}-{}", lo, hi) }).unwrap_or_else(|| "-".into()),
                opt(p.market_demand.as_deref()),
                format!("{:.2}", p.confidence_score),
            ]
        })
        .collect();
    let mut out = render_table(&["id", "type", "title", "match", "salary", "demand", "confidence"], &rows);
    for p in paths {
        if let Some(steps) = p.next_steps.as_ref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("\n{} next steps:", p.title));
            for s in steps {
                out.push_str(&format!("\n  - {}", s));
            }
        }
    }
    out.push_str(&format!("\npaths: {}", paths.len()));
    out
}

pub fn analyses(rows: &[AnalysisSummary]) -> String {
    if rows.is_empty() {
        return "no analyses".to_string();
    }
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.document.as_ref().map(|d| d.filename.clone()).unwrap_or_else(|| a.document_id.to_string()),
                a.status.to_string(),
                a.created_at.format("%Y-%m-%d %H:%M").to_string(),
                opt(a.processing_time.map(|t| format!("{:.1}", t))),
                a.career_recommendations.as_ref().map(|r| r.len()).unwrap_or(0).to_string(),
            ]
        })
        .collect();
    let mut out = render_table(&["id", "document", "status", "created", "time (s)", "paths"], &table);
    out.push_str(&format!("\nrows: {}", rows.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Credential, Identity};
    use serde_json::json;

    fn sample_job(status: &str) -> AnalysisJob {
        let error = if status == "failed" { json!("bad scan") } else { json!(null) };
        serde_json::from_value(json!({
            "id": 42, "document_id": 5, "status": status, "created_at": "2024-05-01T10:00:00",
            "processing_time": 42.0, "error_message": error
        }))
        .unwrap()
    }

    #[test]
    fn status_lines() {
        assert_eq!(status_line(&sample_job("processing")), "analysis 42: processing");
        assert_eq!(status_line(&sample_job("completed")), "analysis 42: completed in 42.0s");
        assert_eq!(status_line(&sample_job("failed")), "analysis 42: failed: bad scan");
    }

    #[test]
    fn job_view_includes_paths() {
        let mut j = sample_job("completed");
        j.result = Some(vec![serde_json::from_value(json!({
            "id": 1, "career_type": "corporate", "title": "Platform engineer", "description": "",
            "required_skills": [], "skill_match_percentage": 85.4, "salary_range_min": 500,
            "salary_range_max": 800, "confidence_score": 0.91, "next_steps": ["Ship a side project"]
        }))
        .unwrap()]);
        let out = job(&j);
        assert!(out.contains("| status              | completed"));
        assert!(out.contains("Platform engineer"));
        assert!(out.contains("500-800"));
        assert!(out.contains("  - Ship a side project"));
        assert!(out.ends_with("paths: 1"));
    }

    #[test]
    fn session_views() {
        assert_eq!(session(&Session::anonymous()), "not signed in");
        let mut id = Identity::new(3, "ann@x.com");
        id.display_name = Some("Ann".into());
        let out = session(&Session::authenticated(Credential::new("opaque"), id));
        assert!(out.contains("Ann"));
        assert!(out.contains("ann@x.com"));
        assert!(!out.contains("opaque"));
    }
}
