//! Task-type names. Each task is reported separately in the database and
//! tagged separately in metrics.

/// Block DAG edges for every block of the epoch's tipset.
pub const TASK_BLOCKS: &str = "blocks";

/// Reward actor state.
pub const TASK_REWARD: &str = "reward";
