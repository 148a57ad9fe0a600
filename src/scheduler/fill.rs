use crate::chain::REWARD_ACTOR_ADDR;
use crate::error::job::{JobError, JobResult};
use crate::metrics::record_queue_len;
use crate::model::{BlockParents, Persistable};
use crate::scheduler::{ExtractionPolicy, JobContext, RunOutcome};
use crate::types::task::TASK_BLOCKS;
use crate::types::{JobConfig, JobId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Actor address an actor task reads at each epoch. Singleton builtin
/// actors only; tasks over actor sets resolve their addresses elsewhere.
fn actor_address(task: &str) -> Option<&'static str> {
    match task {
        crate::types::task::TASK_REWARD => Some(REWARD_ACTOR_ADDR),
        _ => None,
    }
}

/// Walk the scanner's reports and fill each missing epoch: one batch, one
/// transaction per epoch. The cancellation token is polled between epochs
/// only, so a transaction in flight always completes or rolls back whole.
pub(super) async fn run(
    id: JobId,
    config: &JobConfig,
    ctx: &JobContext,
    token: &CancellationToken,
) -> JobResult<RunOutcome> {
    let sink = ctx.sinks.get(&config.storage)?;
    let from = config.from.unwrap_or(0);
    let to = match config.to {
        Some(to) => to,
        None => ctx.chain.head_epoch().await?,
    };

    let reports = ctx
        .scanner
        .scan(&sink, &config.tasks, from, to)
        .await
        .map_err(|err| JobError::Scan(err.to_string()))?;
    debug!(job = %id, gaps = reports.len(), from, to, "gap scan finished");

    for report in reports {
        record_queue_len(&report.task, report.len() as i64);
        let mut remaining = report.len() as i64;
        for epoch in report.epochs() {
            if token.is_cancelled() {
                record_queue_len(&report.task, -remaining);
                return Ok(RunOutcome::Cancelled);
            }
            let batch = assemble(ctx, &report.task, epoch).await?;
            if !batch.is_empty() {
                sink.persist(&batch, &report.task).await.map_err(JobError::Persistence)?;
            }
            remaining -= 1;
            record_queue_len(&report.task, -1);
        }
    }
    Ok(RunOutcome::Completed)
}

/// Build the batch for one task at one epoch, honoring the extraction
/// failure policy.
async fn assemble(
    ctx: &JobContext,
    task: &str,
    epoch: i64,
) -> JobResult<Vec<Box<dyn Persistable>>> {
    let mut batch: Vec<Box<dyn Persistable>> = Vec::new();

    if task == TASK_BLOCKS {
        for header in ctx.chain.block_headers(epoch).await? {
            let edges = BlockParents::from_header(&header);
            if !edges.0.is_empty() {
                batch.push(Box::new(edges));
            }
        }
        return Ok(batch);
    }

    let Some(address) = actor_address(task) else {
        return Err(JobError::Other(format!("task {task:?} has no actor address")));
    };
    let info = ctx.chain.actor(address, epoch).await?;
    match ctx.registry.extract(&info, ctx.chain.as_ref()).await {
        Ok(record) => batch.push(record),
        Err(err) => match ctx.on_extraction_error {
            ExtractionPolicy::Skip => {
                warn!(task, epoch, error = %err, "extraction failed, skipping epoch");
            }
            ExtractionPolicy::Fail => return Err(err.into()),
        },
    }
    Ok(batch)
}
