use crate::model::Persistable;
use async_trait::async_trait;
use sqlx::SqliteConnection;

/// Derived reward actor state for one epoch, keyed by height. All large
/// quantities are stored as decimal text, never binary floats, so downstream
/// consumers read them as exact values.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ChainReward {
    pub height: i64,
    pub state_root: String,
    pub cum_sum_baseline: String,
    pub cum_sum_realized: String,
    pub effective_baseline_power: String,
    pub new_baseline_power: String,
    pub new_reward_smoothed_position_estimate: String,
    pub new_reward_smoothed_velocity_estimate: String,
    pub total_mined_reward: String,
    pub new_reward: String,
    pub effective_network_time: i64,
}

#[async_trait]
impl Persistable for ChainReward {
    fn kind(&self) -> &'static str {
        "chain_reward"
    }

    async fn persist_with_tx(&self, tx: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO chain_rewards (
                height, state_root, cum_sum_baseline, cum_sum_realized,
                effective_baseline_power, new_baseline_power,
                new_reward_smoothed_position_estimate, new_reward_smoothed_velocity_estimate,
                total_mined_reward, new_reward, effective_network_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(self.height)
        .bind(&self.state_root)
        .bind(&self.cum_sum_baseline)
        .bind(&self.cum_sum_realized)
        .bind(&self.effective_baseline_power)
        .bind(&self.new_baseline_power)
        .bind(&self.new_reward_smoothed_position_estimate)
        .bind(&self.new_reward_smoothed_velocity_estimate)
        .bind(&self.total_mined_reward)
        .bind(&self.new_reward)
        .bind(self.effective_network_time)
        .execute(tx)
        .await?;
        Ok(())
    }
}
