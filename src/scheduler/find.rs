use crate::error::job::{JobError, JobResult};
use crate::scheduler::{JobContext, RunOutcome};
use crate::types::{GapReport, JobConfig, JobId};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the gap scan and record its report on the job entry. Read-only with
/// respect to the derived-record tables.
pub(super) async fn run(
    id: JobId,
    config: &JobConfig,
    ctx: &JobContext,
    token: &CancellationToken,
    report: &Arc<Mutex<Option<Vec<GapReport>>>>,
) -> JobResult<RunOutcome> {
    if token.is_cancelled() {
        return Ok(RunOutcome::Cancelled);
    }
    let sink = ctx.sinks.get(&config.storage)?;
    let from = config.from.unwrap_or(0);
    let to = match config.to {
        Some(to) => to,
        None => ctx.chain.head_epoch().await?,
    };

    let found = ctx
        .scanner
        .scan(&sink, &config.tasks, from, to)
        .await
        .map_err(|err| JobError::Scan(err.to_string()))?;
    info!(job = %id, gaps = found.len(), from, to, "gap scan finished");
    *report.lock().expect("report lock poisoned") = Some(found);
    Ok(RunOutcome::Completed)
}
