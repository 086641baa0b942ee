//! Bounded-concurrency job execution and the shared job registry.
//!
//! The registry is one map behind an async mutex; every read and write goes
//! through the accessors here so the locking discipline stays local. The
//! lock is held only for map operations, never across I/O. Worker slots come
//! from a semaphore: at most `max_concurrent_jobs` pipelines run at once,
//! and waiters are served in submission order.

mod types;

pub use types::{
    ArtifactNote, DeploySummary, Job, JobError, JobStatus, JobSummary, is_valid_transition,
};

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore};
use uuid::Uuid;

use crate::errors::PipelineError;

#[derive(Default)]
struct Registry {
    jobs: Mutex<HashMap<String, Job>>,
}

impl Registry {
    async fn insert(&self, job: Job) {
        self.jobs.lock().await.insert(job.id.clone(), job);
    }

    async fn get(&self, id: &str) -> Option<Job> {
        self.jobs.lock().await.get(id).cloned()
    }

    async fn list(&self) -> Vec<JobSummary> {
        let jobs = self.jobs.lock().await;
        let mut summaries: Vec<JobSummary> = jobs.values().map(Job::summary).collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    async fn set_status(&self, id: &str, to: JobStatus) -> bool {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.get_mut(id) else {
            return false;
        };
        if !is_valid_transition(job.status, to) {
            tracing::warn!(job_id = %id, from = %job.status, to = %to, "ignoring invalid status transition");
            return false;
        }
        job.status = to;
        true
    }

    async fn append_log(&self, id: &str, line: String) {
        if let Some(job) = self.jobs.lock().await.get_mut(id) {
            job.logs.push(line);
        }
    }

    async fn record_result(&self, id: &str, result: DeploySummary) {
        if let Some(job) = self.jobs.lock().await.get_mut(id) {
            job.result = Some(result);
        }
    }

    async fn record_error(&self, id: &str, error: JobError) {
        if let Some(job) = self.jobs.lock().await.get_mut(id) {
            job.error = Some(error);
        }
    }
}

/// Owns the job registry and the worker pool.
pub struct JobManager {
    registry: Arc<Registry>,
    slots: Arc<Semaphore>,
}

impl JobManager {
    pub fn new(max_concurrent_jobs: usize) -> Self {
        Self {
            registry: Arc::new(Registry::default()),
            slots: Arc::new(Semaphore::new(max_concurrent_jobs)),
        }
    }

    /// Register a new job in `queued` state. The job's working directory is
    /// derived from its id under `data_dir`; nothing touches the disk yet.
    pub async fn create(&self, data_dir: &Path) -> Job {
        let id = Uuid::new_v4().to_string();
        let job = Job {
            id: id.clone(),
            status: JobStatus::Queued,
            workdir: data_dir.join(&id),
            created_at: Utc::now(),
            logs: Vec::new(),
            result: None,
            error: None,
        };
        self.registry.insert(job.clone()).await;
        job
    }

    pub async fn get(&self, id: &str) -> Option<Job> {
        self.registry.get(id).await
    }

    /// Metadata for every known job, oldest first, without log lines.
    pub async fn list(&self) -> Vec<JobSummary> {
        self.registry.list().await
    }

    /// Apply a lifecycle transition. Returns false (and changes nothing) for
    /// unknown ids and invalid transitions; terminal states are sinks.
    pub async fn set_status(&self, id: &str, to: JobStatus) -> bool {
        self.registry.set_status(id, to).await
    }

    /// Handle for appending to one job's log.
    pub fn logger(&self, id: &str) -> JobLog {
        JobLog {
            id: id.to_string(),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Schedule a pipeline for a freshly created job. The job stays `queued`
    /// until a worker slot frees up; each id is scheduled exactly once.
    pub fn spawn<F>(&self, id: String, pipeline: F)
    where
        F: Future<Output = Result<DeploySummary, PipelineError>> + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let slots = Arc::clone(&self.slots);
        tokio::spawn(async move {
            let _permit = match slots.acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed while the manager lives.
                Err(_) => return,
            };

            let log = JobLog {
                id: id.clone(),
                registry: Arc::clone(&registry),
            };
            registry.set_status(&id, JobStatus::Running).await;
            log.info("Job started").await;

            match pipeline.await {
                Ok(summary) => {
                    registry.record_result(&id, summary).await;
                    registry.set_status(&id, JobStatus::Completed).await;
                    log.info("Job completed successfully").await;
                }
                Err(e) => {
                    let stage = e.label().to_string();
                    let message = format!("{:#}", anyhow::Error::from(e));
                    log.error(format!("Job failed: {message}")).await;
                    registry.record_error(&id, JobError { stage, message }).await;
                    registry.set_status(&id, JobStatus::Failed).await;
                }
            }
        });
    }
}

/// Append-only handle into one job's log. Lines are timestamped here and
/// mirrored to the process-wide tracing output.
#[derive(Clone)]
pub struct JobLog {
    id: String,
    registry: Arc<Registry>,
}

impl JobLog {
    pub async fn info(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::info!(job_id = %self.id, "{msg}");
        self.push("INFO", msg).await;
    }

    pub async fn warn(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::warn!(job_id = %self.id, "{msg}");
        self.push("WARN", msg).await;
    }

    pub async fn error(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::error!(job_id = %self.id, "{msg}");
        self.push("ERROR", msg).await;
    }

    async fn push(&self, level: &str, msg: &str) {
        let line = format!(
            "{} [{level}] {msg}",
            Utc::now().format("%Y-%m-%d %H:%M:%S%.3f")
        );
        self.registry.append_log(&self.id, line).await;
    }
}
