mod fill;
mod find;
pub mod gaps;

use crate::chain::ChainStateReader;
use crate::error::job::{JobError, JobResult};
use crate::extract::ExtractorRegistry;
use crate::storage::SinkSet;
use crate::types::task::TASK_BLOCKS;
use crate::types::{GapReport, JobConfig, JobId, JobKind, JobStatus, JobSummary};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub use gaps::{GapScanner, MissingHeightScanner};

/// What to do when a single extraction fails inside a fill job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionPolicy {
    /// Log and continue with the remaining actors.
    #[default]
    Skip,
    /// Abort the whole job.
    Fail,
}

/// Collaborators a job body runs against. Built once at bootstrap and
/// shared by reference with every job.
pub struct JobContext {
    pub registry: ExtractorRegistry,
    pub sinks: SinkSet,
    pub chain: Arc<dyn ChainStateReader>,
    pub scanner: Arc<dyn GapScanner>,
    pub on_extraction_error: ExtractionPolicy,
}

impl JobContext {
    /// The full registered task-type catalogue.
    pub fn catalogue(&self) -> Vec<String> {
        let mut tasks = vec![TASK_BLOCKS.to_string()];
        tasks.extend(self.registry.task_namespaces());
        tasks.sort();
        tasks.dedup();
        tasks
    }
}

enum RunOutcome {
    Completed,
    Cancelled,
}

struct JobEntry {
    kind: JobKind,
    config: JobConfig,
    status: Arc<Mutex<JobStatus>>,
    report: Arc<Mutex<Option<Vec<GapReport>>>>,
    created_at: chrono::DateTime<chrono::Utc>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Job control plane: assigns identifiers, owns job lifecycle state and
/// hands execution off to the runtime. Submission is fire-and-forget; the
/// caller polls status through `list`.
pub struct JobManager {
    ctx: Arc<JobContext>,
    jobs: Mutex<BTreeMap<JobId, JobEntry>>,
    next_id: AtomicI64,
}

impl JobManager {
    pub fn new(ctx: Arc<JobContext>) -> Arc<Self> {
        Arc::new(Self { ctx, jobs: Mutex::new(BTreeMap::new()), next_id: AtomicI64::new(1) })
    }

    /// Submit a gap-fill job: extract and persist records for the epoch
    /// ranges the scanner reports as missing.
    pub fn submit_fill(&self, config: JobConfig) -> JobResult<JobId> {
        self.submit(JobKind::Fill, config)
    }

    /// Submit a gap-find job: report missing epoch ranges without writing
    /// derived records.
    pub fn submit_find(&self, config: JobConfig) -> JobResult<JobId> {
        self.submit(JobKind::Find, config)
    }

    fn submit(&self, kind: JobKind, config: JobConfig) -> JobResult<JobId> {
        let config = self.resolve_config(config)?;
        let id = JobId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut entry = JobEntry {
            kind,
            config,
            status: Arc::new(Mutex::new(JobStatus::Queued)),
            report: Arc::new(Mutex::new(None)),
            created_at: chrono::Utc::now(),
            token: CancellationToken::new(),
            handle: None,
        };
        entry.handle = Some(spawn_job(self.ctx.clone(), id, &entry));
        self.jobs.lock().expect("job table lock poisoned").insert(id, entry);
        info!(job = %id, kind = %kind, "job submitted");
        Ok(id)
    }

    /// Validate a submitted configuration and expand an empty task set to
    /// the full catalogue.
    fn resolve_config(&self, mut config: JobConfig) -> JobResult<JobConfig> {
        if !self.ctx.sinks.contains(&config.storage) {
            return Err(JobError::InvalidArgument(format!(
                "unknown storage sink {:?}",
                config.storage
            )));
        }
        let catalogue = self.ctx.catalogue();
        if config.tasks.is_empty() {
            config.tasks = catalogue;
        } else if let Some(unknown) = config.tasks.iter().find(|t| !catalogue.contains(t)) {
            return Err(JobError::InvalidArgument(format!("unknown task {unknown:?}")));
        }
        Ok(config)
    }

    /// Resume a stopped job. The job reruns its whole window; idempotent
    /// writes make the overlap harmless.
    pub fn start(&self, id: JobId) -> JobResult<()> {
        let mut jobs = self.jobs.lock().expect("job table lock poisoned");
        let entry = jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        let current = *entry.status.lock().expect("status lock poisoned");
        if !current.is_terminal() {
            return Err(JobError::InvalidState {
                id,
                status: current.to_string(),
                reason: "already running",
            });
        }
        entry.token = CancellationToken::new();
        *entry.status.lock().expect("status lock poisoned") = JobStatus::Queued;
        entry.handle = Some(spawn_job(self.ctx.clone(), id, entry));
        info!(job = %id, "job started");
        Ok(())
    }

    /// Request cooperative cancellation. Takes effect at the next
    /// transaction boundary; stopping an already-stopped job succeeds.
    pub fn stop(&self, id: JobId) -> JobResult<()> {
        let jobs = self.jobs.lock().expect("job table lock poisoned");
        let entry = jobs.get(&id).ok_or(JobError::NotFound(id))?;
        entry.token.cancel();
        info!(job = %id, "job stop requested");
        Ok(())
    }

    /// Snapshot of all known jobs, ascending by id.
    pub fn list(&self) -> Vec<JobSummary> {
        let jobs = self.jobs.lock().expect("job table lock poisoned");
        jobs.iter()
            .map(|(id, entry)| JobSummary {
                id: *id,
                kind: entry.kind,
                status: *entry.status.lock().expect("status lock poisoned"),
                storage: entry.config.storage.clone(),
                tasks: entry.config.tasks.clone(),
                created_at: entry.created_at,
                report: entry.report.lock().expect("report lock poisoned").clone(),
            })
            .collect()
    }

    /// Wait for a job's current run to finish and return its final status.
    pub async fn wait(&self, id: JobId) -> JobResult<JobStatus> {
        let handle = {
            let mut jobs = self.jobs.lock().expect("job table lock poisoned");
            let entry = jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
            entry.handle.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        let jobs = self.jobs.lock().expect("job table lock poisoned");
        let entry = jobs.get(&id).ok_or(JobError::NotFound(id))?;
        let status = *entry.status.lock().expect("status lock poisoned");
        Ok(status)
    }

    /// Cancel every job and wait for all of them to reach a boundary.
    pub async fn shutdown(&self) {
        let ids: Vec<JobId> = {
            let jobs = self.jobs.lock().expect("job table lock poisoned");
            for entry in jobs.values() {
                entry.token.cancel();
            }
            jobs.keys().copied().collect()
        };
        for id in ids {
            let _ = self.wait(id).await;
        }
    }
}

fn spawn_job(ctx: Arc<JobContext>, id: JobId, entry: &JobEntry) -> JoinHandle<()> {
    let kind = entry.kind;
    let config = entry.config.clone();
    let status = entry.status.clone();
    let report = entry.report.clone();
    let token = entry.token.clone();
    tokio::spawn(async move {
        *status.lock().expect("status lock poisoned") = JobStatus::Running;
        let outcome = match kind {
            JobKind::Fill => fill::run(id, &config, &ctx, &token).await,
            JobKind::Find => find::run(id, &config, &ctx, &token, &report).await,
        };
        let next = match outcome {
            Ok(RunOutcome::Completed) => {
                info!(job = %id, "job completed");
                JobStatus::Completed
            }
            Ok(RunOutcome::Cancelled) => {
                info!(job = %id, "job stopped");
                JobStatus::Stopped
            }
            Err(err) => {
                error!(job = %id, error = %err, "job failed");
                JobStatus::Errored
            }
        };
        *status.lock().expect("status lock poisoned") = next;
    })
}
