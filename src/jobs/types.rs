//! Job records and lifecycle states.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::synth::{ArtifactKind, Origin};

/// Lifecycle of a deployment job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Valid lifecycle transitions. Terminal states accept nothing.
pub fn is_valid_transition(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;
    matches!(
        (from, to),
        (Queued, Running) | (Running, Completed) | (Running, Failed)
    )
}

/// What a finished pipeline produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploySummary {
    /// Internal port the application listens on.
    pub port: u16,
    /// `plan` or `apply`, per the dry-run toggle.
    pub mode: String,
    pub artifacts: Vec<ArtifactNote>,
}

/// Which branch produced an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNote {
    pub kind: ArtifactKind,
    pub origin: Origin,
}

/// Structured cause recorded when a job fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    /// Stage label from the error taxonomy.
    pub stage: String,
    pub message: String,
}

/// A deployment job as held in the registry and returned by `get`.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub workdir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub logs: Vec<String>,
    pub result: Option<DeploySummary>,
    pub error: Option<JobError>,
}

impl Job {
    pub(crate) fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            status: self.status,
            workdir: self.workdir.clone(),
            created_at: self.created_at,
            result: self.result.clone(),
            error: self.error.clone(),
            log_count: self.logs.len(),
        }
    }
}

/// Listing view of a job: metadata without the log lines.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub id: String,
    pub status: JobStatus,
    pub workdir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub result: Option<DeploySummary>,
    pub error: Option<JobError>,
    pub log_count: usize,
}
