use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::{DBClient, StoreError};
use crate::models::usagemodels::{UsageCounter, UsageCounters};

#[async_trait]
pub trait UsageExt: Send + Sync {
    async fn get_usage(
        &self,
        user_id: Uuid,
        period_start: NaiveDate,
    ) -> Result<Option<UsageCounters>, StoreError>;

    /// Adds one to `counter`, creating the month's row on first use.
    async fn increment_usage(
        &self,
        user_id: Uuid,
        period_start: NaiveDate,
        counter: UsageCounter,
    ) -> Result<UsageCounters, StoreError>;
}

#[async_trait]
impl UsageExt for DBClient {
    async fn get_usage(
        &self,
        user_id: Uuid,
        period_start: NaiveDate,
    ) -> Result<Option<UsageCounters>, StoreError> {
        let usage = sqlx::query_as::<_, UsageCounters>(
            r#"
            SELECT user_id, period_start, meal_plans_generated, recipes_regenerated, favorites_count
            FROM usage_counters
            WHERE user_id = $1 AND period_start = $2
            "#
        )
        .bind(user_id)
        .bind(period_start)
        .fetch_optional(&self.pool)
        .await?;

        Ok(usage)
    }

    async fn increment_usage(
        &self,
        user_id: Uuid,
        period_start: NaiveDate,
        counter: UsageCounter,
    ) -> Result<UsageCounters, StoreError> {
        // Column names come from a closed enum, never from input.
        let column = counter.column();
        let query = format!(
            r#"
            INSERT INTO usage_counters (user_id, period_start, {column})
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, period_start) DO UPDATE
            SET {column} = usage_counters.{column} + 1, updated_at = NOW()
            RETURNING user_id, period_start, meal_plans_generated, recipes_regenerated, favorites_count
            "#
        );

        let usage = sqlx::query_as::<_, UsageCounters>(&query)
            .bind(user_id)
            .bind(period_start)
            .fetch_one(&self.pool)
            .await?;

        Ok(usage)
    }
}
