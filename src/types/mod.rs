pub mod actor;
pub mod gap;
pub mod job;
pub mod task;

pub use actor::{ActorInfo, BlockHeader};
pub use gap::GapReport;
pub use job::{JobConfig, JobId, JobKind, JobStatus, JobSummary};
