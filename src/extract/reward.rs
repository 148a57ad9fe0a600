use crate::chain::{ChainStateReader, RewardState};
use crate::error::{ChainError, ExtractionError};
use crate::extract::{ActorExtractor, ExtractorRegistry};
use crate::model::{ChainReward, Persistable};
use crate::types::task::TASK_REWARD;
use crate::types::ActorInfo;
use async_trait::async_trait;
use std::sync::Arc;

/// Actor codes the reward extractor answers for, one per network version.
pub const REWARD_ACTOR_CODES: &[&str] = &[
    "bafkqaddgnfwc6mjpojsxoylsmq",
    "bafkqaddgnfwc6mrpojsxoylsmq",
    "bafkqaddgnfwc6mzpojsxoylsmq",
    "bafkqaddgnfwc6nbpojsxoylsmq",
    "bafkqaddgnfwc6njpojsxoylsmq",
    "bafkqaddgnfwc6nrpojsxoylsmq",
    "bafkqaddgnfwc6nzpojsxoylsmq",
];

/// Extracts reward actor state into one `ChainReward` row per epoch.
#[derive(Debug)]
pub struct RewardExtractor;

impl RewardExtractor {
    pub fn register_all(registry: &mut ExtractorRegistry) {
        for code in REWARD_ACTOR_CODES {
            registry.register(*code, Arc::new(RewardExtractor));
        }
    }

    fn record(info: &ActorInfo, state: &RewardState) -> ChainReward {
        ChainReward {
            height: info.epoch,
            state_root: info.parent_state_root.clone(),
            cum_sum_baseline: state.cumsum_baseline.to_string(),
            cum_sum_realized: state.cumsum_realized.to_string(),
            effective_baseline_power: state.effective_baseline_power.to_string(),
            new_baseline_power: state.this_epoch_baseline_power.to_string(),
            new_reward_smoothed_position_estimate: state
                .this_epoch_reward_smoothed
                .position_estimate
                .to_string(),
            new_reward_smoothed_velocity_estimate: state
                .this_epoch_reward_smoothed
                .velocity_estimate
                .to_string(),
            total_mined_reward: state.total_storage_power_reward.to_string(),
            new_reward: state.this_epoch_reward.to_string(),
            effective_network_time: state.effective_network_time,
        }
    }
}

#[async_trait]
impl ActorExtractor for RewardExtractor {
    fn name(&self) -> &'static str {
        TASK_REWARD
    }

    async fn extract(
        &self,
        info: &ActorInfo,
        chain: &dyn ChainStateReader,
    ) -> Result<Box<dyn Persistable>, ExtractionError> {
        let state = chain.reward_state(info).await.map_err(|err| match err {
            ChainError::Decode(reason) => ExtractionError::StateDecode { kind: "reward", reason },
            other => ExtractionError::Chain(other),
        })?;
        Ok(Box::new(Self::record(info, &state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{FilterEstimate, MockChainStateReader};
    use num_bigint::BigInt;
    use rstest::*;

    fn info_at(epoch: i64) -> ActorInfo {
        ActorInfo {
            address: "f02".into(),
            code: REWARD_ACTOR_CODES[0].into(),
            head: "bafyhead".into(),
            epoch,
            parent_state_root: "bafyroot".into(),
        }
    }

    fn fixture_state() -> RewardState {
        RewardState {
            cumsum_baseline: BigInt::parse_bytes(b"36266304935256137977", 10).unwrap(),
            cumsum_realized: BigInt::parse_bytes(b"12768953024339972", 10).unwrap(),
            effective_baseline_power: BigInt::parse_bytes(b"2888890784895530", 10).unwrap(),
            this_epoch_baseline_power: BigInt::parse_bytes(b"2888894543000848", 10).unwrap(),
            this_epoch_reward: BigInt::parse_bytes(b"35994425137814861342", 10).unwrap(),
            this_epoch_reward_smoothed: FilterEstimate {
                position_estimate: BigInt::parse_bytes(
                    b"36266304935256137977856862861404983340",
                    10,
                )
                .unwrap(),
                velocity_estimate: BigInt::parse_bytes(b"-108653133649906508458153", 10).unwrap(),
            },
            total_storage_power_reward: BigInt::parse_bytes(b"5180886242057164152390", 10).unwrap(),
            effective_network_time: 116,
        }
    }

    #[rstest]
    fn one_row_per_epoch_with_exact_decimal_strings() {
        let row = RewardExtractor::record(&info_at(100), &fixture_state());
        assert_eq!(row.height, 100);
        assert_eq!(row.state_root, "bafyroot");
        assert_eq!(row.cum_sum_baseline, "36266304935256137977");
        assert_eq!(row.new_reward, "35994425137814861342");
        assert_eq!(row.new_reward_smoothed_velocity_estimate, "-108653133649906508458153");
        assert_eq!(row.effective_network_time, 116);

        for rendered in [
            &row.cum_sum_baseline,
            &row.cum_sum_realized,
            &row.effective_baseline_power,
            &row.new_baseline_power,
            &row.new_reward_smoothed_position_estimate,
            &row.total_mined_reward,
            &row.new_reward,
        ] {
            assert!(!rendered.is_empty());
            assert!(!rendered.contains(['e', 'E', '.']), "not a plain decimal: {rendered}");
        }
    }

    #[rstest]
    #[tokio::test]
    async fn dispatches_through_the_registry_for_every_known_code() {
        let mut registry = ExtractorRegistry::new();
        RewardExtractor::register_all(&mut registry);

        let mut chain = MockChainStateReader::new();
        chain.expect_reward_state().returning(|_| Ok(fixture_state()));

        for code in REWARD_ACTOR_CODES {
            let mut info = info_at(7);
            info.code = code.to_string();
            let record = registry.extract(&info, &chain).await.unwrap();
            assert_eq!(record.kind(), "chain_reward");
        }
    }

    #[rstest]
    #[tokio::test]
    async fn decode_failure_aborts_only_this_extraction() {
        let mut chain = MockChainStateReader::new();
        chain
            .expect_reward_state()
            .returning(|_| Err(ChainError::Decode("truncated state".into())));

        let err = RewardExtractor.extract(&info_at(100), &chain).await.unwrap_err();
        assert!(matches!(err, ExtractionError::StateDecode { kind: "reward", .. }));
    }
}
