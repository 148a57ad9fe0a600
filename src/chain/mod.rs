pub mod rpc;

use crate::error::ChainError;
use crate::types::{ActorInfo, BlockHeader};
use async_trait::async_trait;
use num_bigint::BigInt;
use serde::Deserialize;

pub use rpc::NodeClient;

/// Address of the singleton reward actor.
pub const REWARD_ACTOR_ADDR: &str = "f02";

/// Read-only view of chain state at fixed epochs, backed by the external
/// node. Implementations must be safe to call concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainStateReader: Send + Sync {
    /// Height of the node's current head tipset.
    async fn head_epoch(&self) -> Result<i64, ChainError>;

    /// Headers of every block in the tipset at the given height.
    async fn block_headers(&self, epoch: i64) -> Result<Vec<BlockHeader>, ChainError>;

    /// Look up an actor by address at the given height.
    async fn actor(&self, address: &str, epoch: i64) -> Result<ActorInfo, ChainError>;

    /// Decoded reward actor state at the actor's epoch.
    async fn reward_state(&self, info: &ActorInfo) -> Result<RewardState, ChainError>;
}

/// Alpha-beta filter estimate of a chain quantity.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterEstimate {
    #[serde(rename = "PositionEstimate", deserialize_with = "bigint_dec::deserialize")]
    pub position_estimate: BigInt,
    #[serde(rename = "VelocityEstimate", deserialize_with = "bigint_dec::deserialize")]
    pub velocity_estimate: BigInt,
}

/// Decoded state of the reward actor. Big quantities keep the chain's
/// arbitrary precision; they are only ever rendered as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RewardState {
    #[serde(rename = "CumsumBaseline", deserialize_with = "bigint_dec::deserialize")]
    pub cumsum_baseline: BigInt,
    #[serde(rename = "CumsumRealized", deserialize_with = "bigint_dec::deserialize")]
    pub cumsum_realized: BigInt,
    #[serde(rename = "EffectiveBaselinePower", deserialize_with = "bigint_dec::deserialize")]
    pub effective_baseline_power: BigInt,
    #[serde(rename = "ThisEpochBaselinePower", deserialize_with = "bigint_dec::deserialize")]
    pub this_epoch_baseline_power: BigInt,
    #[serde(rename = "ThisEpochReward", deserialize_with = "bigint_dec::deserialize")]
    pub this_epoch_reward: BigInt,
    #[serde(rename = "ThisEpochRewardSmoothed")]
    pub this_epoch_reward_smoothed: FilterEstimate,
    #[serde(rename = "TotalStoragePowerReward", deserialize_with = "bigint_dec::deserialize")]
    pub total_storage_power_reward: BigInt,
    #[serde(rename = "EffectiveNetworkTime")]
    pub effective_network_time: i64,
}

/// Serde support for big integers encoded as decimal strings on the wire.
pub mod bigint_dec {
    use num_bigint::BigInt;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigInt, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<BigInt>().map_err(serde::de::Error::custom)
    }
}
