use sqlx::SqlitePool;

/// Idempotent schema setup for a sink. Large chain quantities are decimal
/// text columns; the primary keys carry the conflict-ignore contract.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS block_parents (
            block  TEXT NOT NULL,
            parent TEXT NOT NULL,
            PRIMARY KEY (block, parent)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chain_rewards (
            height                                BIGINT PRIMARY KEY,
            state_root                            TEXT NOT NULL,
            cum_sum_baseline                      TEXT NOT NULL,
            cum_sum_realized                      TEXT NOT NULL,
            effective_baseline_power              TEXT NOT NULL,
            new_baseline_power                    TEXT NOT NULL,
            new_reward_smoothed_position_estimate TEXT NOT NULL,
            new_reward_smoothed_velocity_estimate TEXT NOT NULL,
            total_mined_reward                    TEXT NOT NULL,
            new_reward                            TEXT NOT NULL,
            effective_network_time                BIGINT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
