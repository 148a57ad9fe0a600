use crate::storage::Sink;
use crate::types::gap::{ranges_from_heights, GapReport};
use crate::types::task::TASK_REWARD;
use async_trait::async_trait;

/// Computes which epoch ranges are missing derived records, per task.
///
/// The scan algorithm is a collaborator, not part of the core: the control
/// plane only submits against this contract and the daemon decides which
/// implementation to wire in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GapScanner: Send + Sync {
    async fn scan(
        &self,
        sink: &Sink,
        tasks: &[String],
        from: i64,
        to: i64,
    ) -> anyhow::Result<Vec<GapReport>>;
}

/// Default scanner: diff the expected epoch window against the heights
/// already present in the sink.
///
/// Tasks whose tables are not height-keyed (block edges are keyed by
/// content identifiers) report the whole window; refilling them is free
/// under the conflict-ignore write path.
pub struct MissingHeightScanner;

#[async_trait]
impl GapScanner for MissingHeightScanner {
    async fn scan(
        &self,
        sink: &Sink,
        tasks: &[String],
        from: i64,
        to: i64,
    ) -> anyhow::Result<Vec<GapReport>> {
        let mut reports = Vec::new();
        for task in tasks {
            if task == TASK_REWARD {
                let present = sink.reward_heights(from, to).await?;
                let missing = missing_heights(&present, from, to);
                reports.extend(ranges_from_heights(task, &missing));
            } else if to >= from {
                reports.push(GapReport { task: task.clone(), from, to });
            }
        }
        Ok(reports)
    }
}

fn missing_heights(present: &[i64], from: i64, to: i64) -> Vec<i64> {
    let mut present = present.iter().copied().peekable();
    let mut missing = Vec::new();
    for height in from..=to {
        while present.next_if(|&p| p < height).is_some() {}
        if present.peek() == Some(&height) {
            present.next();
        } else {
            missing.push(height);
        }
    }
    missing
}
