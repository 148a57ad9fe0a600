pub mod schema;

use crate::error::PersistenceError;
use crate::metrics::INDEXER_METRICS;
use crate::model::Persistable;
use opentelemetry::KeyValue;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(30_000);

/// One named storage sink. A stateless transactional gateway: it owns a
/// connection pool and nothing else.
pub struct Sink {
    name: String,
    pool: SqlitePool,
}

impl Sink {
    /// Open the sink and make sure its schema exists.
    pub async fn connect(name: &str, url: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(PersistenceError::Connect)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(DEFAULT_BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_POOL_SIZE)
            .connect_with(options)
            .await
            .map_err(PersistenceError::Connect)?;
        schema::init_schema(&pool).await.map_err(PersistenceError::Schema)?;
        Ok(Self { name: name.to_string(), pool })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// In-memory sink for tests. Pinned to one connection; every pooled
    /// connection to `:memory:` would otherwise see its own database.
    #[cfg(test)]
    pub(crate) async fn memory(name: &str) -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool =
            SqlitePoolOptions::new().max_connections(1).connect_with(options).await.unwrap();
        schema::init_schema(&pool).await.unwrap();
        Self { name: name.to_string(), pool }
    }

    /// Write a batch of records in one transaction, in caller order.
    ///
    /// Any single write failure rolls the whole transaction back and names
    /// the failing record kind. Primary-key conflicts are not failures:
    /// conflicting rows are skipped inside the insert itself, which is what
    /// makes overlapping re-indexing safe without application-level locks.
    #[instrument(skip_all, fields(sink = %self.name, namespace = %namespace, count = batch.len()))]
    pub async fn persist(
        &self,
        batch: &[Box<dyn Persistable>],
        namespace: &str,
    ) -> Result<(), PersistenceError> {
        let started = Instant::now();
        let mut tx = self.pool.begin().await?;
        for record in batch {
            record
                .persist_with_tx(&mut *tx)
                .await
                .map_err(|source| PersistenceError::Write { kind: record.kind(), source })?;
        }
        tx.commit().await?;
        INDEXER_METRICS.persist_duration.record(
            started.elapsed().as_secs_f64() * 1e3,
            &[KeyValue::new("namespace", namespace.to_string())],
        );
        Ok(())
    }

    /// Heights in `[from, to]` that already have a reward row. Used by the
    /// default gap scanner to diff expected against present heights.
    pub async fn reward_heights(&self, from: i64, to: i64) -> Result<Vec<i64>, PersistenceError> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT height FROM chain_rewards WHERE height BETWEEN ? AND ? ORDER BY height")
                .bind(from)
                .bind(to)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(h,)| h).collect())
    }
}

/// The configured set of named sinks. Built once at startup.
#[derive(Clone, Default)]
pub struct SinkSet {
    sinks: HashMap<String, Arc<Sink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sink: Sink) {
        self.sinks.insert(sink.name().to_string(), Arc::new(sink));
    }

    pub fn get(&self, name: &str) -> Result<Arc<Sink>, PersistenceError> {
        self.sinks
            .get(name)
            .cloned()
            .ok_or_else(|| PersistenceError::UnknownSink(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sinks.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockParent, ChainReward};
    use async_trait::async_trait;
    use rstest::*;
    use sqlx::SqliteConnection;

    async fn memory_sink() -> Sink {
        Sink::memory("test").await
    }

    fn edge(block: &str, parent: &str) -> Box<dyn Persistable> {
        Box::new(BlockParent { block: block.into(), parent: parent.into() })
    }

    fn reward_at(height: i64) -> ChainReward {
        ChainReward {
            height,
            state_root: "bafyroot".into(),
            cum_sum_baseline: "100".into(),
            cum_sum_realized: "90".into(),
            effective_baseline_power: "80".into(),
            new_baseline_power: "70".into(),
            new_reward_smoothed_position_estimate: "60".into(),
            new_reward_smoothed_velocity_estimate: "-50".into(),
            total_mined_reward: "40".into(),
            new_reward: "30".into(),
            effective_network_time: height,
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap();
        n
    }

    /// A record whose write always fails, to exercise rollback.
    #[derive(Debug)]
    struct Poisoned;

    #[async_trait]
    impl Persistable for Poisoned {
        fn kind(&self) -> &'static str {
            "poisoned"
        }

        async fn persist_with_tx(&self, tx: &mut SqliteConnection) -> Result<(), sqlx::Error> {
            sqlx::query("INSERT INTO no_such_table (x) VALUES (1)").execute(tx).await?;
            Ok(())
        }
    }

    #[rstest]
    #[tokio::test]
    async fn persisting_same_edge_twice_leaves_one_row() {
        let sink = memory_sink().await;
        let batch = vec![edge("bafyb", "bafyp")];
        sink.persist(&batch, "blocks").await.unwrap();
        sink.persist(&batch, "blocks").await.unwrap();
        assert_eq!(count(sink.pool(), "block_parents").await, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_edges_within_one_batch_are_skipped() {
        let sink = memory_sink().await;
        let batch = vec![edge("bafyb", "bafyp"), edge("bafyb", "bafyp"), edge("bafyb", "bafyq")];
        sink.persist(&batch, "blocks").await.unwrap();
        assert_eq!(count(sink.pool(), "block_parents").await, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn replaying_reward_epoch_keeps_original_row() {
        let sink = memory_sink().await;
        sink.persist(&[Box::new(reward_at(42)) as Box<dyn Persistable>], "reward").await.unwrap();
        let mut replay = reward_at(42);
        replay.new_reward = "999".into();
        sink.persist(&[Box::new(replay) as Box<dyn Persistable>], "reward").await.unwrap();

        let row: ChainReward = sqlx::query_as("SELECT * FROM chain_rewards WHERE height = 42")
            .fetch_one(sink.pool())
            .await
            .unwrap();
        assert_eq!(row.new_reward, "30");
    }

    #[rstest]
    #[tokio::test]
    async fn failed_batch_leaves_no_rows() {
        let sink = memory_sink().await;
        let batch: Vec<Box<dyn Persistable>> =
            vec![edge("bafyb", "bafyp"), Box::new(reward_at(7)), Box::new(Poisoned)];
        let err = sink.persist(&batch, "blocks").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Write { kind: "poisoned", .. }));
        assert_eq!(count(sink.pool(), "block_parents").await, 0);
        assert_eq!(count(sink.pool(), "chain_rewards").await, 0);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_overlapping_persists_produce_the_union() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("sink.db").display());
        let sink = Arc::new(Sink::connect("primary", &url).await.unwrap());

        let a = {
            let sink = sink.clone();
            tokio::spawn(async move {
                let batch = vec![edge("bafyb", "bafyp1"), edge("bafyb", "bafyp2")];
                sink.persist(&batch, "blocks").await
            })
        };
        let b = {
            let sink = sink.clone();
            tokio::spawn(async move {
                let batch = vec![edge("bafyb", "bafyp2"), edge("bafyb", "bafyp3")];
                sink.persist(&batch, "blocks").await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(count(sink.pool(), "block_parents").await, 3);
    }

    #[rstest]
    #[tokio::test]
    async fn reward_heights_returns_present_heights_in_order() {
        let sink = memory_sink().await;
        for height in [5, 3, 9] {
            sink.persist(&[Box::new(reward_at(height)) as Box<dyn Persistable>], "reward")
                .await
                .unwrap();
        }
        assert_eq!(sink.reward_heights(0, 10).await.unwrap(), vec![3, 5, 9]);
        assert_eq!(sink.reward_heights(4, 6).await.unwrap(), vec![5]);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_sink_is_rejected() {
        let sinks = SinkSet::new();
        assert!(matches!(sinks.get("primary"), Err(PersistenceError::UnknownSink(_))));
    }
}
