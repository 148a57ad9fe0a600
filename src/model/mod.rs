pub mod blocks;
pub mod reward;

use async_trait::async_trait;
use sqlx::SqliteConnection;

pub use blocks::{BlockParent, BlockParents};
pub use reward::ChainReward;

/// Capability to be written inside an open transaction.
///
/// Implementations insert with conflict-ignore semantics: a row whose
/// primary key already exists is skipped silently, so replaying extraction
/// for an epoch that was already indexed has no observable effect.
/// The caller owns the transaction and commits or rolls back as a whole.
#[async_trait]
pub trait Persistable: std::fmt::Debug + Send + Sync {
    /// Record kind, used to identify the failing record in errors.
    fn kind(&self) -> &'static str;

    async fn persist_with_tx(&self, tx: &mut SqliteConnection) -> Result<(), sqlx::Error>;
}
