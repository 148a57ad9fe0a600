use crate::types::gap::GapReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::fmt;
use std::time::Duration;

/// Opaque, process-unique job identifier. Monotonically assigned by the
/// control plane, immutable once assigned.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobKind {
    /// Execute extraction and persistence for the targeted epoch ranges.
    Fill,
    /// Report missing epoch ranges per task without writing derived records.
    Find,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    /// Accepted by the control plane, not yet picked up by the runtime
    Queued,
    /// Actively walking epochs
    Running,
    /// Cancelled cooperatively at a transaction boundary
    Stopped,
    /// Ran to the end of its epoch window
    Completed,
    /// Aborted by an unrecoverable error
    Errored,
}

impl JobStatus {
    /// Queued and running jobs can still make progress; everything else is
    /// final until an explicit `start`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Stopped | JobStatus::Completed | JobStatus::Errored)
    }
}

/// Submitted job configuration.
///
/// The restart fields are carried opaquely for the external scheduler
/// runtime; the control plane never interprets them.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    #[serde(default)]
    pub restart_on_failure: bool,
    #[serde(default)]
    pub restart_on_completion: bool,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default)]
    pub restart_delay: Duration,
    /// Name of the configured storage sink results are written to.
    pub storage: String,
    /// Task-type names to run. Empty resolves to the full catalogue.
    #[serde(default)]
    pub tasks: Vec<String>,
    /// Lowest epoch of the window. Defaults to 0.
    #[serde(default)]
    pub from: Option<i64>,
    /// Highest epoch of the window. Defaults to the node's current head.
    #[serde(default)]
    pub to: Option<i64>,
}

impl JobConfig {
    pub fn for_storage(storage: impl Into<String>) -> Self {
        Self {
            restart_on_failure: false,
            restart_on_completion: false,
            restart_delay: Duration::ZERO,
            storage: storage.into(),
            tasks: Vec::new(),
            from: None,
            to: None,
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<String>) -> Self {
        self.tasks = tasks;
        self
    }
}

/// One row of the `list` snapshot.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JobSummary {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub storage: String,
    pub tasks: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Gap report recorded by a completed find job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Vec<GapReport>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&JobStatus::Queued).unwrap(), "\"queued\"");
        assert_eq!(JobStatus::Running.to_string(), "running");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Errored.is_terminal());
    }

    #[test]
    fn job_config_roundtrips_with_duration_seconds() {
        let config = JobConfig {
            restart_delay: Duration::from_secs(30),
            ..JobConfig::for_storage("primary")
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["restart_delay"], 30);
        let back: JobConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
